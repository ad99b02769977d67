//! Renders transcript items as plain text.
//!
//! The transcript is append-and-patch, so rendering is incremental: a
//! watermark tracks the last printed `ItemId` and only later items are
//! written. Items removed after printing (ephemeral status lines, stale
//! panels) simply stay on screen; a line UI cannot unprint them.

use std::io::{self, Write};

use iara_core::types::{ErrorAnalysis, Schedule, WeeklyPlan};
use iara_engine::{ItemId, QuestionKind, Sender, TranscriptItem};

/// Writes every item newer than the watermark, then advances it.
pub fn render_new<W: Write>(
    out: &mut W,
    items: &[TranscriptItem],
    watermark: &mut Option<ItemId>,
) -> io::Result<()> {
    for item in items {
        if watermark.is_some_and(|seen| item.id() <= seen) {
            continue;
        }
        render_item(out, item)?;
        *watermark = Some(item.id());
    }
    Ok(())
}

fn render_item<W: Write>(out: &mut W, item: &TranscriptItem) -> io::Result<()> {
    match item {
        TranscriptItem::Message { sender, text, .. } => {
            let who = match sender {
                Sender::User => "Você",
                Sender::Assistant => "IAra",
            };
            writeln!(out, "{who}: {text}")
        }
        TranscriptItem::Question { kind, .. } => match kind {
            QuestionKind::SubjectMenu { subjects } => {
                writeln!(out, "IAra: Escolha uma matéria:")?;
                for (i, subject) in subjects.iter().enumerate() {
                    writeln!(out, "  {}) {subject}", i + 1)?;
                }
                Ok(())
            }
            QuestionKind::Exam(q) => {
                writeln!(out, "IAra: [{}] {}", q.materia, q.enunciado)?;
                for (key, text) in &q.alternativas {
                    writeln!(out, "  {key}) {text}")?;
                }
                match (&q.fonte, q.ano) {
                    (Some(fonte), Some(ano)) => writeln!(out, "  ({fonte} {ano})"),
                    (Some(fonte), None) => writeln!(out, "  ({fonte})"),
                    (None, Some(ano)) => writeln!(out, "  ({ano})"),
                    (None, None) => Ok(()),
                }
            }
        },
        TranscriptItem::ActionMenu { .. } => {
            writeln!(out, "O que você quer fazer?")?;
            writeln!(out, "  1) Receber questões")?;
            writeln!(out, "  2) Editar cronograma")?;
            writeln!(out, "  3) Ver plano semanal")?;
            writeln!(out, "  4) Analisar desempenho")
        }
        TranscriptItem::Schedule { schedule, .. } => render_schedule(out, schedule),
        TranscriptItem::WeeklyPlan { plan, .. } => render_plan(out, plan),
        TranscriptItem::Analysis { analysis, .. } => render_analysis(out, analysis),
    }
}

fn render_schedule<W: Write>(out: &mut W, schedule: &Schedule) -> io::Result<()> {
    writeln!(out, "Cronograma: {}", schedule.nome)?;
    if schedule.materias.is_empty() {
        writeln!(out, "  (vazio — use /add-materia <nome>)")?;
    }
    for materia in &schedule.materias {
        writeln!(out, "  [{}] {}", materia.id, materia.nome)?;
        for topico in &materia.topicos {
            let mark = if topico.concluido { "x" } else { " " };
            writeln!(out, "    [{mark}] ({}) {}", topico.id, topico.nome)?;
        }
    }
    Ok(())
}

fn render_plan<W: Write>(out: &mut W, plan: &WeeklyPlan) -> io::Result<()> {
    match plan {
        WeeklyPlan::Plan(days) => {
            writeln!(out, "Plano semanal:")?;
            for (day, topic) in days {
                writeln!(out, "  {day}: {topic}")?;
            }
            Ok(())
        }
        WeeklyPlan::Unavailable { detalhe } => writeln!(out, "IAra: {detalhe}"),
    }
}

fn render_analysis<W: Write>(out: &mut W, analysis: &ErrorAnalysis) -> io::Result<()> {
    writeln!(out, "IAra: {}", analysis.feedback_text)?;
    if !analysis.suggested_topics.is_empty() {
        writeln!(out, "Tópicos sugeridos:")?;
        for topic in &analysis.suggested_topics {
            writeln!(out, "  - {topic}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use iara_core::types::Question;
    use iara_engine::TranscriptState;

    use super::*;

    #[test]
    fn watermark_skips_already_rendered_items() {
        let mut transcript = TranscriptState::new();
        transcript.push_message(Sender::Assistant, "Olá!");
        let mut watermark = None;

        let mut first = Vec::new();
        render_new(&mut first, transcript.items(), &mut watermark).unwrap();
        assert_eq!(String::from_utf8(first).unwrap(), "IAra: Olá!\n");

        transcript.push_message(Sender::User, "oi");
        let mut second = Vec::new();
        render_new(&mut second, transcript.items(), &mut watermark).unwrap();
        assert_eq!(String::from_utf8(second).unwrap(), "Você: oi\n");
    }

    #[test]
    fn exam_question_lists_options_and_source() {
        let mut transcript = TranscriptState::new();
        transcript.push_question(QuestionKind::Exam(Question {
            question_id: "q1".to_string(),
            materia: "Matemática".to_string(),
            enunciado: "Quanto é 2 + 2?".to_string(),
            alternativas: BTreeMap::from([
                ("a".to_string(), "3".to_string()),
                ("b".to_string(), "4".to_string()),
            ]),
            fonte: Some("ENEM".to_string()),
            ano: Some(2021),
        }));
        let mut rendered = Vec::new();
        render_new(&mut rendered, transcript.items(), &mut None).unwrap();
        let text = String::from_utf8(rendered).unwrap();
        assert!(text.contains("[Matemática] Quanto é 2 + 2?"));
        assert!(text.contains("  a) 3"));
        assert!(text.contains("  b) 4"));
        assert!(text.contains("(ENEM 2021)"));
    }

    #[test]
    fn unavailable_plan_renders_its_detail() {
        let mut transcript = TranscriptState::new();
        transcript.push_weekly_plan(WeeklyPlan::Unavailable {
            detalhe: "Cronograma vazio".to_string(),
        });
        let mut rendered = Vec::new();
        render_new(&mut rendered, transcript.items(), &mut None).unwrap();
        assert_eq!(
            String::from_utf8(rendered).unwrap(),
            "IAra: Cronograma vazio\n"
        );
    }
}
