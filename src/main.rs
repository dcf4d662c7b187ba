use chrono::Utc;
use clap::{ArgAction, ColorChoice, CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};

mod cloudwatch;
mod error;
mod event;
mod fields;
mod filter;
mod output;
mod stream;
mod time;

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
enum LogLevel { Error, Warn, Info, Debug, Trace }

#[derive(Parser, Debug)]
#[command(
    name = "cjl",
    about = "CloudWatch JSON logs client",
    long_about = "Queries a CloudWatch log group for events in a time window, decodes each event's JSON message body, and prints selected fields tab-separated, one line per event.",
    after_long_help = "Examples:\n  cjl -s 6h my-log-group 'service=agent-service && request_id=abc123'\n  cjl --force-order -s 1d my-log-group\n  cjl -o service,message my-log-group\n  cjl --raw my-log-group\n\nTime formats:\n  Times are relative: an integer followed by a unit specifier.\n  Valid unit specifiers are m for minute, h for hour, d for day.\n  eg. --start=6h is six hours back. --end is unbounded by default.\n\nOutput fields:\n  Fields are listed in the order they should be displayed. Message fields\n  keep their own names; service metadata is namespaced under 'source.',\n  eg. source.logStreamName, source.timestamp, source.timestamp_local.",
    color = ColorChoice::Auto
)]
struct Args {
    /// CloudWatch log group to query
    log_group: String,
    /// Filter expression, eg. 'service=agent-service && request_id=abc123'
    filter: Option<String>,
    /// Load all events and sort by message timestamp before output
    #[arg(long, short = 'f', default_value_t = false)]
    force_order: bool,
    /// Raw JSON output: print each message body verbatim, no normalization
    #[arg(long, short = 'r', default_value_t = false, conflicts_with_all = ["output", "force_order"])]
    raw: bool,
    /// Start of the time window
    #[arg(long, short = 's', default_value = "6h")]
    start: String,
    /// End of the time window (default: unbounded)
    #[arg(long, short = 'e')]
    end: Option<String>,
    /// Output fields to use, eg. 'field1,field2'
    #[arg(long, short = 'o')]
    output: Option<String>,
    /// AWS region override (default: environment / profile)
    #[arg(long)]
    region: Option<String>,
    /// AWS credentials profile
    #[arg(long)]
    profile: Option<String>,
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
    #[arg(short = 'q', long, default_value_t = false)]
    quiet: bool,
    #[arg(long)]
    log_level: Option<LogLevel>,
    #[arg(long)]
    config: Option<String>,
    #[arg(long, value_enum)]
    completions: Option<Shell>,
}

#[derive(Deserialize)]
struct AppConfig {
    start: Option<String>,
    end: Option<String>,
    output: Option<String>,
    region: Option<String>,
    profile: Option<String>,
    force_order: Option<bool>,
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = Args::parse();
    if let Some(sh) = args.completions {
        let mut cmd = Args::command();
        clap_complete::generate(sh, &mut cmd, "cjl", &mut std::io::stdout());
        return Ok(());
    }
    if let Some(p) = args.config.as_ref()
        && let Ok(s) = std::fs::read_to_string(p)
        && let Ok(cfg) = toml::from_str::<AppConfig>(&s) { apply_config(&mut args, cfg); }
    else {
        let def = "cjl.toml";
        if let Ok(s) = std::fs::read_to_string(def)
            && let Ok(cfg) = toml::from_str::<AppConfig>(&s) { apply_config(&mut args, cfg); }
    }
    {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if args.quiet {
            builder.filter_level(log::LevelFilter::Error);
        } else if let Some(lvl) = args.log_level {
            let f = match lvl { LogLevel::Error => log::LevelFilter::Error, LogLevel::Warn => log::LevelFilter::Warn, LogLevel::Info => log::LevelFilter::Info, LogLevel::Debug => log::LevelFilter::Debug, LogLevel::Trace => log::LevelFilter::Trace };
            builder.filter_level(f);
        } else if args.verbose > 0 {
            let f = if args.verbose >= 3 { log::LevelFilter::Trace } else if args.verbose == 2 { log::LevelFilter::Debug } else { log::LevelFilter::Info };
            builder.filter_level(f);
        }
        builder.init();
    }
    run(args).await
}

async fn run(args: Args) -> anyhow::Result<()> {
    let fields = fields::select(args.output.as_deref());
    let now = Utc::now();
    let request = cloudwatch::QueryRequest {
        log_group: args.log_group.clone(),
        start_time: time::resolve(Some(&args.start), now)?,
        end_time: time::resolve(args.end.as_deref(), now)?,
        filter_pattern: filter::translate(args.filter.as_deref()),
        interleaved: true,
    };
    log::debug!("query request: {:?}", request);
    let client = cloudwatch::make_client(args.region.clone(), args.profile.clone()).await;
    if args.raw {
        cloudwatch::for_each_page(&client, &request, |batch| {
            for envelope in batch {
                println!("{}", envelope.message);
            }
            Ok(())
        })
        .await?;
    } else if args.force_order {
        let mut buffered = Vec::new();
        cloudwatch::for_each_page(&client, &request, |batch| {
            buffered.extend(stream::normalize_page(batch)?);
            Ok(())
        })
        .await?;
        stream::sort_by_message_timestamp(&mut buffered)?;
        log::info!("sorted {} events", buffered.len());
        for event in &buffered {
            println!("{}", output::format_line(event, &fields));
        }
    } else {
        cloudwatch::for_each_page(&client, &request, |batch| {
            for event in stream::normalize_page(batch)? {
                println!("{}", output::format_line(&event, &fields));
            }
            Ok(())
        })
        .await?;
    }
    Ok(())
}

fn apply_config(args: &mut Args, cfg: AppConfig) {
    if args.start == "6h" && let Some(v) = cfg.start { args.start = v; }
    if args.end.is_none() && let Some(v) = cfg.end { args.end = Some(v); }
    if args.output.is_none() && let Some(v) = cfg.output { args.output = Some(v); }
    if args.region.is_none() && let Some(v) = cfg.region { args.region = Some(v); }
    if args.profile.is_none() && let Some(v) = cfg.profile { args.profile = Some(v); }
    if !args.force_order && let Some(v) = cfg.force_order { args.force_order = v; }
    if args.log_level.is_none() && let Some(v) = cfg.log_level { args.log_level = Some(v); }
}


#[cfg(test)]
mod tests_pipeline {
    use super::*;
    use crate::event::{RawEnvelope, SourceMeta, normalize};

    #[test]
    fn default_fields_render_a_full_line() {
        let env = RawEnvelope {
            message: r#"{"timestamp":"2020-01-01T00:00:00Z","service":"s1","log_type":"app","message":"hello"}"#.to_string(),
            source: SourceMeta {
                log_stream_name: Some("ls1".to_string()),
                timestamp: Some(1_577_836_800_000),
                ingestion_time: None,
                event_id: None,
            },
        };
        let e = normalize(env).unwrap();
        let line = output::format_line(&e, &fields::select(None));
        let cols: Vec<&str> = line.split('\t').collect();
        assert_eq!(cols.len(), 4);
        assert_eq!(cols[1], "s1");
        assert_eq!(cols[2], "app");
        assert_eq!(cols[3], "hello");
        assert!(!cols[0].is_empty());
    }

    #[test]
    fn request_wiring_uses_all_three_resolvers() {
        let now = Utc::now();
        let req = cloudwatch::QueryRequest {
            log_group: "my-group".to_string(),
            start_time: time::resolve(Some("6h"), now).unwrap(),
            end_time: time::resolve(None, now).unwrap(),
            filter_pattern: filter::translate(Some("a=1")),
            interleaved: true,
        };
        assert_eq!(req.start_time, Some(now.timestamp_millis() - 6 * 3600 * 1000));
        assert_eq!(req.end_time, None);
        assert_eq!(req.filter_pattern.as_deref(), Some("{ $.a=1 }"));
        assert!(req.interleaved);
    }
}
