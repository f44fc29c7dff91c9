use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::warn;

use seimoney_core::{
    AgentClient, Config, Conversation, ConversationState, LinkExtractor, SendOutcome,
    WalletAddress, WalletConfig, WalletSession,
};

/// Prompts offered when the composer is empty
pub const SUGGESTED_MESSAGES: &[&str] = &[
    "I want to create a payment link",
    "How do I set up content gating?",
    "Show me how to process payroll payments",
];

/// Highlights shown on the landing screen
pub const FEATURES: &[(&str, &str)] = &[
    ("Instant Setup", "Get started in seconds with our intuitive interface"),
    ("Multi-currency", "Accept payments in any cryptocurrency on Sei Network"),
    ("Secure", "Built with enterprise-grade security standards"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Landing,
    Conversation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Wallet,
    File,
}

/// Values resolved from CLI flags, environment, and config file
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub link_domain: String,
    pub address: Option<WalletAddress>,
}

/// Composer contents handed to a send, kept until the user message is recorded
#[derive(Debug, Clone)]
pub struct PendingSubmit {
    pub input: String,
    pub file: Option<PathBuf>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub dark_mode: bool,

    // Composer
    pub input: String,
    pub input_cursor: usize,
    pub selected_file: Option<PathBuf>,
    pub show_suggestions: bool,
    pub suggestion_state: ListState,

    // Popup prompt (wallet address / file path)
    pub prompt: Option<PromptKind>,
    pub prompt_input: String,
    pub prompt_cursor: usize,
    pub prompt_error: Option<String>,

    // Conversation
    pub conversation: Conversation<AgentClient>,
    pub view: ConversationState,
    pub send_task: Option<JoinHandle<anyhow::Result<SendOutcome>>>,
    pub pending_submit: Option<PendingSubmit>,
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,

    // Wallet
    pub wallet: WalletSession,
    pub wallet_config: WalletConfig,

    // Short-lived status line message
    pub toast: Option<String>,

    // Animation state
    pub animation_frame: u8,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,

    pub config: Config,
    pub api_url: String,
}

impl App {
    pub fn new(config: Config, settings: Settings) -> Self {
        let extractor = LinkExtractor::new(&settings.link_domain);
        let conversation =
            Conversation::with_extractor(AgentClient::new(&settings.api_url), extractor);

        // Restore the last wallet unless one was given on the command line
        let address = settings.address.or_else(|| {
            config.wallet_address.as_deref().and_then(|raw| {
                WalletAddress::parse(raw)
                    .map_err(|e| warn!(error = %e, "ignoring saved wallet address"))
                    .ok()
            })
        });
        let wallet = match address {
            Some(address) => WalletSession::connected(address),
            None => WalletSession::disconnected(),
        };

        let wallet_config = WalletConfig::new(config.resolved_project_id());

        Self {
            should_quit: false,
            screen: Screen::Landing,
            input_mode: InputMode::Editing,
            dark_mode: config.dark_mode,

            input: String::new(),
            input_cursor: 0,
            selected_file: None,
            show_suggestions: false,
            suggestion_state: ListState::default(),

            prompt: None,
            prompt_input: String::new(),
            prompt_cursor: 0,
            prompt_error: None,

            conversation,
            view: ConversationState::default(),
            send_task: None,
            pending_submit: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            wallet,
            wallet_config,

            toast: None,
            animation_frame: 0,
            chat_area: None,

            config,
            api_url: settings.api_url,
        }
    }

    /// Pull the latest conversation state for rendering
    pub fn sync_conversation(&mut self) {
        let snapshot = self.conversation.snapshot();
        let grew = snapshot.messages.len() != self.view.messages.len()
            || snapshot.is_thinking != self.view.is_thinking
            || snapshot.notice != self.view.notice;
        self.view = snapshot;
        if grew {
            self.scroll_chat_to_bottom();
        }
    }

    /// Put back a message that never reached the conversation
    pub fn restore_pending_submit(&mut self) {
        if let Some(pending) = self.pending_submit.take() {
            self.input_cursor = pending.input.chars().count();
            self.input = pending.input;
            self.selected_file = pending.file;
            self.input_mode = InputMode::Editing;
        }
    }

    /// Submission is allowed only with a wallet connected and nothing in flight
    pub fn is_busy(&self) -> bool {
        self.send_task.is_some() || self.view.is_thinking
    }

    // Suggestions dropdown
    pub fn toggle_suggestions(&mut self) {
        self.show_suggestions = !self.show_suggestions;
        if self.show_suggestions && self.suggestion_state.selected().is_none() {
            self.suggestion_state.select(Some(0));
        }
    }

    pub fn suggestion_nav_down(&mut self) {
        let len = SUGGESTED_MESSAGES.len();
        let i = self.suggestion_state.selected().unwrap_or(0);
        self.suggestion_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn suggestion_nav_up(&mut self) {
        let i = self.suggestion_state.selected().unwrap_or(0);
        self.suggestion_state.select(Some(i.saturating_sub(1)));
    }

    /// Fill the composer with the highlighted suggestion (does not send)
    pub fn apply_suggestion(&mut self) {
        if let Some(suggestion) = self
            .suggestion_state
            .selected()
            .and_then(|i| SUGGESTED_MESSAGES.get(i))
        {
            self.input = suggestion.to_string();
            self.input_cursor = self.input.chars().count();
            self.input_mode = InputMode::Editing;
        }
        self.show_suggestions = false;
    }

    // Prompts
    pub fn open_prompt(&mut self, kind: PromptKind) {
        self.prompt = Some(kind);
        self.prompt_input.clear();
        self.prompt_cursor = 0;
        self.prompt_error = None;
        self.show_suggestions = false;
    }

    pub fn close_prompt(&mut self) {
        self.prompt = None;
        self.prompt_input.clear();
        self.prompt_cursor = 0;
        self.prompt_error = None;
    }

    /// Validate the prompt contents and apply them. Leaves the prompt open on error.
    pub fn submit_prompt(&mut self) {
        let Some(kind) = self.prompt else {
            return;
        };
        let value = self.prompt_input.trim().to_string();

        match kind {
            PromptKind::Wallet => match WalletAddress::parse(&value) {
                Ok(address) => {
                    self.toast = Some(format!("Connected {}", address.short()));
                    self.config.wallet_address = Some(address.to_string());
                    self.wallet.connect(address);
                    self.persist_config();
                    self.close_prompt();
                }
                Err(e) => self.prompt_error = Some(e.to_string()),
            },
            PromptKind::File => {
                let path = PathBuf::from(&value);
                if path.is_file() {
                    self.selected_file = Some(path);
                    self.close_prompt();
                } else {
                    self.prompt_error = Some(format!("{} is not a readable file", value));
                }
            }
        }
    }

    pub fn disconnect_wallet(&mut self) {
        self.wallet.disconnect();
        self.config.wallet_address = None;
        self.persist_config();
        self.toast = Some("Wallet disconnected".to_string());
    }

    pub fn remove_file(&mut self) {
        self.selected_file = None;
    }

    pub fn toggle_theme(&mut self) {
        self.dark_mode = !self.dark_mode;
        self.config.dark_mode = self.dark_mode;
        self.persist_config();
    }

    fn persist_config(&self) {
        if let Err(e) = self.config.save() {
            warn!(error = %e, "failed to save config");
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.view.is_thinking {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        let max = self.chat_line_count().saturating_sub(self.visible_chat_height());
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    /// Scroll chat to bottom so the newest message (or "Thinking...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let total_lines = self.chat_line_count();
        let visible_height = self.visible_chat_height();
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    fn visible_chat_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Approximate wrapped line count of the chat panel
    fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        for msg in &self.view.messages {
            total_lines = total_lines.saturating_add(1); // "You:" / "Agent:"
            let body = match msg.sender {
                seimoney_core::Sender::User => msg.text.clone(),
                seimoney_core::Sender::Agent => seimoney_core::sanitize::to_plain_text(&msg.text),
            };
            for line in body.lines() {
                let char_count = line.chars().count();
                let wrapped = if char_count == 0 {
                    1
                } else {
                    (char_count / wrap_width) + 1
                };
                total_lines = total_lines.saturating_add(wrapped as u16);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if self.view.notice.is_some() {
            total_lines = total_lines.saturating_add(2);
        }
        if self.view.is_thinking {
            total_lines = total_lines.saturating_add(2);
        }

        total_lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ADDR: &str = "0x1111111111111111111111111111111111111111";

    fn app() -> App {
        App::new(
            Config::new(),
            Settings {
                api_url: "http://127.0.0.1:1".to_string(),
                link_domain: "seimoney.link".to_string(),
                address: None,
            },
        )
    }

    #[tokio::test]
    async fn test_starts_on_landing_with_wallet_from_config() {
        let config = Config {
            wallet_address: Some(ADDR.to_string()),
            ..Config::new()
        };
        let app = App::new(
            config,
            Settings {
                api_url: "http://127.0.0.1:1".to_string(),
                link_domain: "seimoney.link".to_string(),
                address: None,
            },
        );
        assert_eq!(app.screen, Screen::Landing);
        assert!(app.wallet.is_connected());
    }

    #[tokio::test]
    async fn test_invalid_saved_address_is_ignored() {
        let config = Config {
            wallet_address: Some("not-an-address".to_string()),
            ..Config::new()
        };
        let app = App::new(
            config,
            Settings {
                api_url: "http://127.0.0.1:1".to_string(),
                link_domain: "seimoney.link".to_string(),
                address: None,
            },
        );
        assert!(!app.wallet.is_connected());
    }

    #[tokio::test]
    async fn test_apply_suggestion_fills_input() {
        let mut app = app();
        app.toggle_suggestions();
        app.suggestion_nav_down();
        app.apply_suggestion();

        assert_eq!(app.input, SUGGESTED_MESSAGES[1]);
        assert_eq!(app.input_cursor, SUGGESTED_MESSAGES[1].chars().count());
        assert!(!app.show_suggestions);
    }

    #[tokio::test]
    async fn test_suggestion_nav_is_clamped() {
        let mut app = app();
        app.toggle_suggestions();
        for _ in 0..10 {
            app.suggestion_nav_down();
        }
        assert_eq!(app.suggestion_state.selected(), Some(SUGGESTED_MESSAGES.len() - 1));
        for _ in 0..10 {
            app.suggestion_nav_up();
        }
        assert_eq!(app.suggestion_state.selected(), Some(0));
    }

    #[tokio::test]
    async fn test_invalid_file_keeps_prompt_open() {
        let mut app = app();
        app.open_prompt(PromptKind::File);
        app.prompt_input = "/definitely/not/here.pdf".to_string();
        app.submit_prompt();

        assert_eq!(app.prompt, Some(PromptKind::File));
        assert!(app.prompt_error.is_some());
        assert_eq!(app.selected_file, None);
    }
}
