//! Receipt content classification.
//!
//! The gatekeeper asks one closed-form question, "is this a receipt?", and
//! gets a three-way answer: affirmative, negative, or the call itself failed.
//! A negative verdict is final; only a failed call consults the fallback
//! label classifier, and when that fails too the chain fails closed.

pub mod chain;
#[cfg(feature = "classifier-rekognition")]
pub mod fallback;
#[cfg(feature = "classifier-vision")]
pub mod primary;
pub mod verdict;

pub use chain::{ClassifierChain, CANNOT_VERIFY_MESSAGE, NOT_RECEIPT_MESSAGE};
#[cfg(feature = "classifier-rekognition")]
pub use fallback::RekognitionLabelClassifier;
#[cfg(feature = "classifier-vision")]
pub use primary::VisionReceiptClassifier;
pub use verdict::{LabelClassifier, ReceiptClassifier, Verdict};
