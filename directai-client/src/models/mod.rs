pub mod kind;
pub mod classifier;
pub mod detector;
pub mod multi_classifier;

pub use kind::ModelKind;
pub use classifier::Classifier;
pub use detector::Detector;
pub use multi_classifier::MultiClassifier;
