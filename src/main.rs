use log::{error, info, warn};
use sms_quorum::audit::FileAuditSink;
use sms_quorum::{Coordinator, Member, MemoryStore, S3Store, VoteMode, VoteStore};
use std::collections::HashMap;
use std::env;
use std::io::BufRead;
use std::sync::Arc;

/// Parse a two-column `name,number` roster file (header row expected).
fn parse_members_csv(contents: &str) -> HashMap<String, Member> {
    let mut members = HashMap::new();
    for line in contents.lines().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.split_once(',') {
            Some((name, number)) => {
                let member = Member::new(name.trim(), number.trim());
                members.insert(member.sms_number.clone(), member);
            }
            None => warn!("skipping malformed roster line: {}", line),
        }
    }
    members
}

async fn build_store() -> Arc<dyn VoteStore> {
    match env::var("SMSQ_BACKEND").as_deref() {
        Ok("s3") => {
            let bucket =
                env::var("SMSQ_BUCKET").expect("SMSQ_BUCKET must be set for the s3 backend");
            Arc::new(S3Store::new(bucket).await)
        }
        _ => Arc::new(MemoryStore::new()),
    }
}

fn print_help() {
    println!("commands:");
    println!("  start <title>                open a resolution vote");
    println!("  elect <title> <c1,c2,...>    open an election");
    println!("  cast <number> <text>         record an inbound message");
    println!("  stop                         close, archive, and reset");
    println!("  status | results             query the session");
    println!("  export <YYYY_MM_DD>          dump archived summaries");
    println!("  quit");
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let org = env::var("SMSQ_DEFAULT_ORG").unwrap_or_else(|_| "default".to_string());
    let audit_dir = env::var("SMSQ_AUDIT_DIR").unwrap_or_else(|_| ".".to_string());
    let store = build_store().await;
    let coordinator = Coordinator::new(store, Arc::new(FileAuditSink::new(audit_dir)));

    if let Ok(path) = env::var("SMSQ_MEMBERS_FILE") {
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let members = parse_members_csv(&contents);
                info!("loaded {} members from {}", members.len(), path);
                if let Err(e) = coordinator.replace_members(&org, members).await {
                    error!("failed to store membership: {}", e);
                }
            }
            Err(e) => error!("could not read {}: {}", path, e),
        }
    }

    print_help();
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let mut parts = line.trim().splitn(3, ' ');
        let command = parts.next().unwrap_or("");
        let result = match command {
            "start" => {
                // Everything after the command is the title.
                let title = match (parts.next(), parts.next()) {
                    (Some(a), Some(b)) => format!("{a} {b}"),
                    (Some(a), None) => a.to_string(),
                    _ => String::new(),
                };
                coordinator
                    .start(&org, &title, VoteMode::Resolution, &[])
                    .await
                    .map(|_| format!("resolution \"{title}\" open"))
            }
            "elect" => {
                let title = parts.next().unwrap_or("").to_string();
                let candidates: Vec<String> = parts
                    .next()
                    .unwrap_or("")
                    .split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect();
                coordinator
                    .start(&org, &title, VoteMode::Election, &candidates)
                    .await
                    .map(|_| format!("election \"{title}\" open"))
            }
            "cast" => {
                let number = parts.next().unwrap_or("");
                let text = parts.next().unwrap_or("");
                coordinator
                    .cast(&org, number, text)
                    .await
                    .map(|outcome| outcome.response_text())
            }
            "stop" => coordinator
                .stop(&org)
                .await
                .map(|summary| sms_quorum::tally::render_summary(&summary)),
            "status" => Ok(format!("{:?}", coordinator.status(&org).await)),
            "results" => Ok(sms_quorum::tally::render_summary(
                &coordinator.results(&org).await,
            )),
            "export" => {
                let date = parts.next().unwrap_or("");
                coordinator.export_archive(&org, date).await
            }
            "quit" | "exit" => break,
            "" => continue,
            _ => {
                print_help();
                continue;
            }
        };
        match result {
            Ok(text) => println!("{text}"),
            Err(e) => println!("error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_parse_skips_header_and_bad_lines() {
        let csv = "name,number\nAnn Alvarez,+15550001\n\nnot a row\nBo Chen , +15550002\n";
        let members = parse_members_csv(csv);
        assert_eq!(members.len(), 2);
        assert_eq!(members["+15550001"].name, "Ann Alvarez");
        assert_eq!(members["+15550002"].name, "Bo Chen");
    }
}
