//! Line-based front-end: command parsing and a stdout [`CallView`].

use tagcall_call::{CallView, ViewState};
use tagcall_core::{ChatEntry, ChatSender};

pub const HELP: &str = "\
Commands:
  /call <tag>   start a call with whoever joins the same tag
  /hangup       end the current call
  /help         show this help
  /quit         hang up and exit
Anything else is sent as a chat message.";

#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Call(String),
    Hangup,
    Help,
    Quit,
    Message(String),
    Unknown(String),
    Empty,
}

pub fn parse_line(line: &str) -> Input {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Message(line.to_owned());
    };
    let (name, rest) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
    match name {
        // The tag is passed through untrimmed; the controller validates it.
        "call" => Input::Call(rest.to_owned()),
        "hangup" => Input::Hangup,
        "help" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => Input::Unknown(other.to_owned()),
    }
}

/// Prints every view update and keeps a [`ViewState`] for queries.
pub struct TerminalView {
    state: ViewState,
}

impl TerminalView {
    pub fn new(chat_history: usize) -> Self {
        Self { state: ViewState::new(chat_history) }
    }

    pub fn call_active(&self) -> bool {
        self.state.snapshot().call_active
    }
}

impl CallView for TerminalView {
    fn alert(&self, message: &str) {
        println!("! {message}");
        self.state.alert(message);
    }

    fn show_local_preview(&self, stream_id: Option<&str>) {
        match stream_id {
            Some(id) => println!("* local preview: {id}"),
            None => println!("* local preview cleared"),
        }
        self.state.show_local_preview(stream_id);
    }

    fn show_remote_preview(&self, stream_id: Option<&str>) {
        match stream_id {
            Some(id) => println!("* remote preview: {id}"),
            None => println!("* remote preview cleared"),
        }
        self.state.show_remote_preview(stream_id);
    }

    fn append_chat(&self, entry: &ChatEntry) {
        let who = match entry.sender {
            ChatSender::Local => "you",
            ChatSender::Peer => "peer",
        };
        println!("[{who}] {}", entry.text);
        self.state.append_chat(entry);
    }

    fn clear_message_input(&self) {
        self.state.clear_message_input();
    }

    fn call_active_changed(&self, active: bool) {
        self.state.call_active_changed(active);
        println!("* [{}]", self.state.toggle_label());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_line("/call chess"), Input::Call("chess".into()));
        assert_eq!(parse_line("/call"), Input::Call(String::new()));
        assert_eq!(parse_line("/hangup"), Input::Hangup);
        assert_eq!(parse_line("/help"), Input::Help);
        assert_eq!(parse_line("/quit\r\n"), Input::Quit);
        assert_eq!(parse_line("/dance"), Input::Unknown("dance".into()));
    }

    #[test]
    fn plain_lines_are_chat() {
        assert_eq!(parse_line("hello there"), Input::Message("hello there".into()));
        assert_eq!(parse_line("  padded  "), Input::Message("  padded  ".into()));
        assert_eq!(parse_line("   "), Input::Message("   ".into()));
        assert_eq!(parse_line(""), Input::Empty);
    }

    #[test]
    fn terminal_view_tracks_call_flag() {
        let view = TerminalView::new(5);
        assert!(!view.call_active());
        view.call_active_changed(true);
        assert!(view.call_active());
    }
}
