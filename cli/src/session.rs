use anyhow::Result;
use feedsage_core::agent::AgentLoop;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

const PROMPT: &str = "What is your question: ";

pub fn is_exit_command(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "exit" | "quit")
}

pub fn print_answer(answer: &str) {
    println!("\n ------ ANSWER -------\n");
    termimad::print_text(answer);
}

/// Reads questions until `exit`, `quit` or end of input. A failed turn is
/// reported and the session continues.
pub async fn run_interactive(agent: &AgentLoop) -> Result<()> {
    println!("\n ------ RAG AGENT -------");
    println!("Type 'exit' or 'quit' to leave.\n");

    let mut editor = DefaultEditor::new()?;

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if is_exit_command(input) {
                    break;
                }
                let _ = editor.add_history_entry(input);

                println!("\n🤔 Processing...");
                match agent.invoke(input).await {
                    Ok(answer) => print_answer(&answer),
                    Err(e) => eprintln!("❌ Error: {}", e),
                }
                println!();
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    println!("👋 Goodbye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_words_are_case_insensitive() {
        for input in ["exit", "EXIT", "Quit", " quit  "] {
            assert!(is_exit_command(input), "{input:?} should exit");
        }
    }

    #[test]
    fn questions_mentioning_exit_do_not_end_the_session() {
        assert!(!is_exit_command("exit strategy for startups?"));
        assert!(!is_exit_command("q"));
        assert!(!is_exit_command(""));
    }
}
