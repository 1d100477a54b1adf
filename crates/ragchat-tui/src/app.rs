use anyhow::anyhow;
use ragchat_core::{Conversation, RagClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Pending-input buffer
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Chat state
    pub conversation: Conversation,
    pub query_task: Option<tokio::task::JoinHandle<anyhow::Result<Option<String>>>>,

    // Chat viewport
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub client: RagClient,
    pub server_label: String,
}

impl App {
    pub fn new(client: RagClient, server_label: String) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            input: String::new(),
            cursor: 0,

            conversation: Conversation::new(),
            query_task: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            client,
            server_label,
        }
    }

    /// Submit the input buffer as a query.
    ///
    /// Appends the user message, clears the buffer, and spawns the request
    /// task. Blank input and a still-pending query leave everything as is.
    pub fn submit_query(&mut self) {
        let Some(query) = self.conversation.begin_query(&self.input) else {
            return;
        };

        self.input.clear();
        self.cursor = 0;

        let client = self.client.clone();
        self.query_task = Some(tokio::spawn(async move { client.ask(&query).await }));

        // Scroll to bottom so "Thinking..." is visible
        self.scroll_chat_to_bottom();
    }

    /// Reap the request task once it has finished and record its outcome.
    pub async fn poll_query_task(&mut self) {
        let finished = self
            .query_task
            .as_ref()
            .map_or(false, |task| task.is_finished());
        if !finished {
            return;
        }

        if let Some(task) = self.query_task.take() {
            let outcome = match task.await {
                Ok(result) => result,
                // A panicked request task counts as a transport failure.
                Err(err) => Err(anyhow!(err)),
            };

            self.conversation.complete(outcome);
            self.scroll_chat_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.awaiting_reply() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    /// Scroll the transcript so the latest message (or the typing
    /// indicator) is visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.conversation.messages() {
            total_lines += 1; // Role line ("You:" or "AI:")
            for line in msg.text.lines() {
                // Character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.conversation.awaiting_reply() {
            total_lines += 2; // "AI:" + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        } else {
            self.chat_scroll = 0;
        }
    }
}
