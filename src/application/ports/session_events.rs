/// Session-change notifications from the authentication collaborator.
/// These are the only lifecycle triggers the sync core reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { user_id: String },
    SignedOut,
}

impl SessionEvent {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self::SignedIn {
            user_id: user_id.into(),
        }
    }

    pub fn signed_out() -> Self {
        Self::SignedOut
    }
}
