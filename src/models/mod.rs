//! Model packages, invocation and risk fusion

pub mod engine;
pub mod fusion;
pub mod invoker;
pub mod loader;
pub mod package;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{Assessment, RiskEngine};
pub use fusion::{FusionConfig, RiskFusionEngine};
pub use invoker::{AnomalyTransform, ModelInvoker, RawScore};
pub use loader::ModelLoader;
pub use package::{FeatureSchema, ModelKind, ModelPackage, StandardScaler};
pub use registry::ModelRegistry;
