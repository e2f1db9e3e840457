//! Navigation port

/// Port for sending the user to another route.
///
/// The client calls this once per failed refresh cascade, with the
/// unauthenticated entry route.
pub trait Navigator: Send + Sync {
    /// Navigates to `route`, discarding in-progress view state.
    fn redirect(&self, route: &str);
}
