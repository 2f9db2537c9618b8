// Application layer: pipelines wiring the core stages to concrete adapters.

pub mod pipelines;
