/// A request to change the state of one aggregate instance.
///
/// Each user-facing command maps to exactly one new event: a handler loads
/// (or constructs) the target aggregate, invokes a single domain method, and
/// saves. Multi-event commands are not supported by this design.
pub trait Command {
    /// The entity id of the aggregate this command targets.
    fn aggregate_id(&self) -> &str;
}
