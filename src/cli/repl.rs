//! Interactive REPL for Datalyst
//!
//! Provides the main user interaction loop. One thread id is kept for the
//! whole session so follow-up questions continue the same conversation.

use std::io::{self, BufRead, Write};

use crate::core::Result;
use crate::service::{AgentService, ChatRequest};

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl<'a> {
    service: &'a AgentService,
    thread_id: String,
}

impl<'a> Repl<'a> {
    /// Create a REPL over a started service
    pub fn new(service: &'a AgentService) -> Self {
        Self {
            service,
            thread_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("You: ");
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            match input.to_lowercase().as_str() {
                "exit" | "quit" => {
                    println!("\nGoodbye!");
                    break;
                }
                "clear" => {
                    // A fresh thread id starts a fresh conversation
                    self.thread_id = uuid::Uuid::new_v4().to_string();
                    println!("Conversation cleared.\n");
                    continue;
                }
                _ => {}
            }

            println!("Agent: Thinking...");
            let request = ChatRequest::new(input, Some(self.thread_id.clone()));
            match self.service.handle(request).await {
                Ok(response) => {
                    println!("\nAgent: {}\n", response.answer);
                }
                Err(e) => {
                    eprintln!("\nError: {}\n", e);
                }
            }
        }

        Ok(())
    }

    /// Print the startup banner
    fn print_banner(&self) {
        println!("\n=== Natural Language Data Analyst ===");
        println!("Tools: {}", self.service.tool_names().join(", "));
        println!("Type 'exit' or 'quit' to stop, 'clear' to start over.");
        println!("=====================================\n");
    }
}
