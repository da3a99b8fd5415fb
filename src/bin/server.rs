//! Chizel chat server binary.
//! Run with: cargo run --bin chizel-chat-server

use std::process::ExitCode;

use chizel_chat::start_chizel_chat;

fn main() -> ExitCode {
    start_chizel_chat::run()
}
