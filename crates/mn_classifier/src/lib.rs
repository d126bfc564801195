mod category;
pub mod classifier;

pub use classifier::{Classifier, MEDICAL_THRESHOLD};
