use uuid::Uuid;

/// Identity for one pipeline instance.
///
/// Injected at construction; there is no ambient current-user global. On
/// sign-out the pipeline is dropped and a new one is built for the next
/// identity. Quota and duplicate checks run against `owner_id`, which is
/// the parent account for staff members and the account itself otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeContext {
    pub account_id: Uuid,
    pub owner_id: Uuid,
}

impl IntakeContext {
    pub fn new(account_id: Uuid, owner_id: Uuid) -> Self {
        IntakeContext {
            account_id,
            owner_id,
        }
    }
}
