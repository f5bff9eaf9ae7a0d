#[derive(Clone, Debug)]
pub struct ConsumerOptions {
    /// Unacked deliveries the broker may push to this consumer.
    pub prefetch: u16,
    /// Empty lets the broker assign one.
    pub consumer_tag: String,
    /// If true, enables publisher confirms and waits for the broker ACK/NACK on republish.
    pub confirms: bool,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            prefetch: 10,
            consumer_tag: String::new(),
            confirms: true,
        }
    }
}
