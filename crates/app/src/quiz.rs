use std::time::Duration;

use leksika_core::model::SessionPolicy;
use leksika_services::{AppServices, SessionEngine};
use tokio::io::{AsyncBufReadExt, BufReader};

/// How long to wait for input on the open question.
fn input_deadline(session: &SessionEngine) -> Option<Duration> {
    match (
        session.question_deadline_remaining(),
        session.session_time_remaining(),
    ) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

pub async fn run_quiz(
    services: &AppServices,
    policy: SessionPolicy,
    seed: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let loop_svc = services.session_loop();
    let mut session = match seed {
        Some(seed) => loop_svc.start_session_seeded(policy, seed).await?,
        None => loop_svc.start_session(policy).await?,
    };
    println!(
        "{} word(s) scheduled, enter the number of your answer (Ctrl-D quits)",
        session.scheduled()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut abandoned = false;

    while let Some(question) = session.current_question() {
        let progress = session.progress();
        println!();
        println!(
            "[{} answered, {} left] {}",
            progress.answered,
            progress.remaining,
            question.prompt()
        );
        for (i, option) in question.options().iter().enumerate() {
            println!("  {}) {}", i + 1, option);
        }
        let option_count = question.options().len();

        let line = match input_deadline(&session) {
            Some(wait) => match tokio::time::timeout(wait, lines.next_line()).await {
                Ok(line) => line?,
                Err(_elapsed) => {
                    if session.is_finished() {
                        println!("time is up");
                        break;
                    }
                    let result = loop_svc.expire_current(&mut session).await?;
                    println!("too slow: {}", result.feedback.correct_answer);
                    continue;
                }
            },
            None => lines.next_line().await?,
        };

        let Some(line) = line else {
            abandoned = true;
            break;
        };

        let choice = match line.trim().parse::<usize>() {
            Ok(n) if (1..=option_count).contains(&n) => n - 1,
            _ => {
                println!("enter a number between 1 and {option_count}");
                continue;
            }
        };

        if session.is_finished() {
            println!("time is up");
            break;
        }
        let result = loop_svc.answer_current(&mut session, choice).await?;
        if result.feedback.correct {
            println!("correct");
        } else {
            println!("wrong: {}", result.feedback.correct_answer);
        }
    }

    loop_svc.drain_write_backs().await;

    if abandoned && !session.is_finished() {
        println!("quiz abandoned, nothing recorded");
        return Ok(());
    }

    loop_svc.finalize_history(&mut session).await?;
    let summary = session.summary()?;
    println!();
    println!(
        "correct: {}  mistakes: {}  total: {:.1}s  average: {:.1}s",
        summary.correct_count(),
        summary.mistakes().len(),
        summary.total_time_seconds(),
        summary.avg_time_seconds(),
    );
    for word in summary.mistakes() {
        println!("  {} - {}", word.source_term(), word.target_term());
    }
    Ok(())
}
