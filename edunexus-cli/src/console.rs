//! The interactive question loop.
//!
//! One question at a time: read a line, answer it, print the result. A
//! failed question prints a diagnostic and the loop carries on; only an exit
//! word, a blank line or end of input ends the session.

use std::io::{BufRead, Write};

use anyhow::Result;
use edunexus_rag::{Answer, Assistant, RagError};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::warn;

/// Characters of each excerpt shown in the retrieval preview.
const PREVIEW_CHARS: usize = 100;

const PROMPT: &str = "Ask a question (or type 'exit'): ";

/// A line typed at the prompt, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Blank line, `exit` or `quit` (any case).
    Exit,
    /// A question, trimmed and ending with `?`.
    Question(String),
}

/// Classify one line of user input.
pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() || line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return Input::Exit;
    }
    if line.ends_with('?') {
        Input::Question(line.to_string())
    } else {
        Input::Question(format!("{line}?"))
    }
}

/// Presentation switches for [`run_console`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleOptions {
    /// Skip the per-excerpt preview under "Retrieved documents".
    pub quiet: bool,
}

/// Where the console gets its lines from.
pub trait LineSource {
    /// Read the next line, showing `prompt` if the source draws its own.
    /// `None` ends the session.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Whether [`read_line`](Self::read_line) displays the prompt itself.
    fn shows_prompt(&self) -> bool {
        false
    }
}

/// Lines from any buffered reader; the console prints the prompt.
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: BufRead> ReaderSource<R> {
    /// Read lines from `reader` until end of input.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// Line editing and history for an interactive terminal.
pub struct EditorSource {
    editor: DefaultEditor,
}

impl EditorSource {
    /// Attach to the terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be configured.
    pub fn new() -> Result<Self> {
        Ok(Self { editor: DefaultEditor::new()? })
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.as_str())?;
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn shows_prompt(&self) -> bool {
        true
    }
}

/// Run the question loop until the user leaves.
///
/// Reads questions from `input` and writes the transcript to `output`.
/// Ctrl-C and Ctrl-D at an [`EditorSource`] prompt leave like `exit`.
///
/// # Errors
///
/// Only I/O errors on `input`/`output` end the loop with an error; failures
/// answering a question are reported in the transcript.
pub async fn run_console<S, W>(
    assistant: &Assistant,
    options: ConsoleOptions,
    mut input: S,
    mut output: W,
) -> Result<()>
where
    S: LineSource,
    W: Write,
{
    writeln!(output, "\nWelcome to EduNexus, your student Q&A companion!")?;
    writeln!(output, "------------------------------------------------")?;

    match assistant.indexed_chunks().await {
        Ok(0) => {
            warn!(collection = assistant.collection(), "index is empty");
            writeln!(
                output,
                "Warning: the textbook index is empty. Answers will come from general \
                 knowledge only; run `edunexus ingest` to add textbooks."
            )?;
        }
        Ok(_) => {}
        Err(e) => {
            warn!(error = %e, "could not read the index");
            writeln!(output, "Warning: could not read the textbook index: {e}")?;
        }
    }

    loop {
        if input.shows_prompt() {
            writeln!(output)?;
        } else {
            write!(output, "\n{PROMPT}")?;
        }
        output.flush()?;

        let Some(line) = input.read_line(PROMPT)? else {
            writeln!(output)?;
            break;
        };

        let question = match parse_input(&line) {
            Input::Exit => break,
            Input::Question(question) => question,
        };

        writeln!(output, "\nThinking...\n")?;
        match assistant.ask(&question).await {
            Ok(answer) => print_answer(&mut output, &answer, options)?,
            Err(e) => print_error(&mut output, &e)?,
        }
    }

    writeln!(output, "Goodbye! Keep learning and stay curious.")?;
    Ok(())
}

fn print_answer(output: &mut impl Write, answer: &Answer, options: ConsoleOptions) -> Result<()> {
    if answer.sources.is_empty() {
        writeln!(output, "No relevant documents found. Using model knowledge.")?;
    } else {
        writeln!(output, "Retrieved documents: {} relevant found", answer.sources.len())?;
        if !options.quiet {
            for (i, source) in answer.sources.iter().enumerate() {
                writeln!(output, "  Doc {}: {}", i + 1, preview(source.text()))?;
            }
        }
    }
    writeln!(output, "Answer:\n{}\n", answer.text)?;
    Ok(())
}

fn print_error(output: &mut impl Write, error: &RagError) -> Result<()> {
    writeln!(output, "Error: {error}")?;
    writeln!(output, "Tips:")?;
    for tip in tips(error) {
        writeln!(output, "- {tip}")?;
    }
    Ok(())
}

/// Remediation hints for a failed question.
fn tips(error: &RagError) -> &'static [&'static str] {
    match error {
        RagError::GenerationError { .. } => &["Check your GROQ_API_KEY and network connection."],
        RagError::EmbeddingError { .. }
        | RagError::VectorStoreError { .. }
        | RagError::PipelineError(_) => &[
            "Check your HF_TOKEN and network connection.",
            "Ensure the index directory is accessible; `edunexus ingest --rebuild` recreates it.",
        ],
        _ => &[
            "Check your GROQ_API_KEY and network connection.",
            "Ensure the index directory is accessible.",
        ],
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() { format!("{head}...") } else { head }
}
