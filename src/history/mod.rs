use crate::models::chat::ChatMessage;

/// Number of trailing messages forwarded upstream when nothing else is configured.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Sliding window over the client-supplied conversation.
///
/// Plain "last N messages" truncation. No token counting and no summarisation;
/// older turns are dropped without trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    size: usize,
}

impl HistoryWindow {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn trim<'a>(&self, messages: &'a [ChatMessage]) -> &'a [ChatMessage] {
        let start = messages.len().saturating_sub(self.size);
        &messages[start..]
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> Vec<ChatMessage> {
        (0..n)
            .map(|i| if i % 2 == 0 {
                ChatMessage::user(format!("q{}", i))
            } else {
                ChatMessage::assistant(format!("a{}", i))
            })
            .collect()
    }

    #[test]
    fn short_history_passes_through() {
        let messages = numbered(4);
        assert_eq!(HistoryWindow::default().trim(&messages), &messages[..]);
        assert!(HistoryWindow::default().trim(&[]).is_empty());
    }

    #[test]
    fn keeps_trailing_ten_in_order() {
        let messages = numbered(13);
        let kept = HistoryWindow::default().trim(&messages);
        assert_eq!(kept.len(), 10);
        assert_eq!(kept.first().unwrap().content, "a3");
        assert_eq!(kept.last().unwrap().content, "q12");
        assert_eq!(kept, &messages[3..]);
    }

    #[test]
    fn exact_window_is_untouched() {
        let messages = numbered(10);
        assert_eq!(HistoryWindow::new(10).trim(&messages).len(), 10);
        assert_eq!(HistoryWindow::new(3).trim(&messages), &messages[7..]);
    }
}
