//! The interactive chat loop.
//!
//! Reads lines, translates them into engine events against the current
//! transcript (a bare number answers whichever interactive item is live),
//! lets the runtime settle, and prints whatever the transcript gained.

use std::io::{BufRead, Write};

use anyhow::Result;
use iara_engine::{ChatEvent, EngineRuntime, EngineState, MenuAction, QuestionKind};

use super::render;

const QUIT_COMMAND: &str = ":q";
const PROMPT_PREFIX: &str = "> ";

const HELP: &str = "Comandos: resposta (a-d), número do menu, texto livre, \
/materia <nome>, /dica, /fechar, /add-materia <nome>, \
/add-topico <id> <nome>, /del-materia <id>, /del-topico <id>, :q";

/// What one input line asks the loop to do.
enum LineCommand {
    Quit,
    Event(ChatEvent),
    Unknown,
}

pub async fn run_chat<R, W>(input: R, output: &mut W, mut runtime: EngineRuntime) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    writeln!(output, "IARA Chat ({QUIT_COMMAND} para sair)")?;

    let mut watermark = None;
    runtime.handle(ChatEvent::Started);
    runtime.settle().await;
    if let Some(reason) = runtime.take_redirect() {
        anyhow::bail!(reason);
    }
    render::render_new(output, runtime.state.transcript.items(), &mut watermark)?;
    let _ = runtime.state.transcript.take_scroll_request();

    write!(output, "{PROMPT_PREFIX}")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        match parse_line(&runtime.state, &line) {
            None => {}
            Some(LineCommand::Quit) => {
                writeln!(output, "Até logo!")?;
                return Ok(());
            }
            Some(LineCommand::Unknown) => {
                writeln!(output, "{HELP}")?;
            }
            Some(LineCommand::Event(event)) => {
                runtime.handle(event);
                runtime.settle().await;
                // A countdown may have fired while we were blocked on input.
                while let Some(event) = runtime.try_event() {
                    runtime.handle(event);
                    runtime.settle().await;
                }
                if let Some(reason) = runtime.take_redirect() {
                    anyhow::bail!(reason);
                }
                render::render_new(output, runtime.state.transcript.items(), &mut watermark)?;
                if runtime.state.hints.is_offering() {
                    writeln!(
                        output,
                        "IAra: Precisa de uma dica? Use /dica (ou /fechar para dispensar)."
                    )?;
                }
                let _ = runtime.state.transcript.take_scroll_request();
            }
        }
        write!(output, "{PROMPT_PREFIX}")?;
        output.flush()?;
    }

    writeln!(output, "Até logo!")?;
    Ok(())
}

/// Maps an input line onto an engine event, using the live transcript
/// items to disambiguate bare numbers and letters.
fn parse_line(state: &EngineState, line: &str) -> Option<LineCommand> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed == QUIT_COMMAND {
        return Some(LineCommand::Quit);
    }

    if let Some(rest) = trimmed.strip_prefix('/') {
        return Some(parse_slash_command(rest));
    }

    if let Ok(n) = trimmed.parse::<usize>() {
        if let Some((_, QuestionKind::SubjectMenu { subjects })) = state.transcript.live_question()
        {
            return Some(match n.checked_sub(1).and_then(|i| subjects.get(i)) {
                Some(subject) => LineCommand::Event(ChatEvent::AnswerQuestion {
                    key: subject.clone(),
                }),
                None => LineCommand::Unknown,
            });
        }
        if state.transcript.live_menu().is_some() {
            let action = match n {
                1 => MenuAction::GetQuestions,
                2 => MenuAction::EditSchedule,
                3 => MenuAction::GetWeeklySchedule,
                4 => MenuAction::AnalyzePerformance,
                _ => return Some(LineCommand::Unknown),
            };
            return Some(LineCommand::Event(ChatEvent::Menu { action }));
        }
    }

    if trimmed.len() == 1
        && trimmed.chars().all(|c| c.is_ascii_alphabetic())
        && matches!(
            state.transcript.live_question(),
            Some((_, QuestionKind::Exam(_)))
        )
    {
        return Some(LineCommand::Event(ChatEvent::AnswerQuestion {
            key: trimmed.to_ascii_lowercase(),
        }));
    }

    Some(LineCommand::Event(ChatEvent::SubmitMessage {
        text: trimmed.to_string(),
    }))
}

fn parse_slash_command(rest: &str) -> LineCommand {
    let mut parts = rest.splitn(2, ' ');
    let cmd = parts.next().unwrap_or("");
    let arg = parts.next().map(str::trim).unwrap_or("");

    match cmd {
        "materia" if !arg.is_empty() => LineCommand::Event(ChatEvent::SelectSubject {
            subject: arg.to_string(),
        }),
        "dica" => LineCommand::Event(ChatEvent::RequestHint),
        "fechar" => LineCommand::Event(ChatEvent::DismissHint),
        "add-materia" if !arg.is_empty() => LineCommand::Event(ChatEvent::AddSubject {
            nome: arg.to_string(),
        }),
        "add-topico" => {
            let mut args = arg.splitn(2, ' ');
            let id = args.next().and_then(|s| s.parse().ok());
            let nome = args.next().map(str::trim).filter(|s| !s.is_empty());
            match (id, nome) {
                (Some(subject_id), Some(nome)) => LineCommand::Event(ChatEvent::AddTopic {
                    subject_id,
                    nome: nome.to_string(),
                }),
                _ => LineCommand::Unknown,
            }
        }
        "del-materia" => match arg.parse() {
            Ok(subject_id) => LineCommand::Event(ChatEvent::DeleteSubject { subject_id }),
            Err(_) => LineCommand::Unknown,
        },
        "del-topico" => match arg.parse() {
            Ok(topic_id) => LineCommand::Event(ChatEvent::DeleteTopic { topic_id }),
            Err(_) => LineCommand::Unknown,
        },
        _ => LineCommand::Unknown,
    }
}
