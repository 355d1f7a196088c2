mod fingerprint;
mod line_item;
mod quota;
mod upload;

pub use fingerprint::ContentFingerprint;
pub use line_item::LineItem;
pub use quota::QuotaDecision;
pub use upload::{ImageBlob, UploadDescriptor};
