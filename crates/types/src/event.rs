/// Destination for the typed events a component emits while executing.
///
/// Components stay generic over where events go; the runtime collects them
/// into its transaction log and tests can simply pass a `Vec`.
pub trait EventSink<E> {
    fn emit(&mut self, event: E);
}

impl<E> EventSink<E> for Vec<E> {
    fn emit(&mut self, event: E) {
        self.push(event);
    }
}
