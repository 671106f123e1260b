use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use aribcc::caption::{DataUnitBody, GroupData, Timestamp};
use aribcc::eight::decode::{Options, ResetPolicy};
use aribcc::{ByteCursor, Session};

#[derive(Debug)]
struct AppArgs {
    oneseg: bool,
    reset: bool,
    report_drcs: bool,
    path: PathBuf,
}

impl AppArgs {
    const HELP: &str = "\
字幕のデータグループを並べたファイルから字幕を表示するコマンド

USAGE:
  caption [OPTIONS] [PATH]

FLAGS:
  -h, --help      このヘルプを表示する
  --oneseg        ワンセグの初期状態でデコードする
  --reset         字幕文ごとに符号の指示を初期化する
  --report-drcs   DRCSの定義をログに出力する

ARGS:
  <PATH>          データグループを並べたファイルのパス
";

    pub fn parse() -> Result<AppArgs, Box<dyn std::error::Error>> {
        let mut args = pico_args::Arguments::from_env();

        if args.contains(["-h", "--help"]) {
            println!("{}", Self::HELP);
            std::process::exit(0);
        }

        Ok(AppArgs {
            oneseg: args.contains("--oneseg"),
            reset: args.contains("--reset"),
            report_drcs: args.contains("--report-drcs"),
            path: args.free_from_str()?,
        })
    }
}

fn format_time(ts: Option<Timestamp>) -> String {
    let time = ts
        .and_then(Timestamp::to_millis)
        .and_then(|ms| {
            chrono::NaiveTime::from_num_seconds_from_midnight_opt(
                (ms / 1000) as u32,
                (ms % 1000) as u32 * 1_000_000,
            )
        });
    match time {
        Some(time) => time.format("%T%.3f").to_string(),
        None => "--:--:--.---".to_string(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = AppArgs::parse()?;

    env_logger::init();

    let decode = if args.oneseg {
        Options::ONESEG_CAPTION
    } else {
        Options::CAPTION
    };
    let reset = if args.reset {
        ResetPolicy::PerStatementBody
    } else {
        ResetPolicy::Persist
    };
    let mut session = Session::new(aribcc::session::Options {
        decode: decode.with_reset(reset),
        report_drcs: args.report_drcs,
        ..Default::default()
    });

    let f = File::open(&*args.path)?;
    let mut cursor = ByteCursor::new(BufReader::new(f));

    for group in session.data_groups(&mut cursor) {
        let group = match group {
            Ok(group) => group,
            Err(e) => {
                log::error!("データグループの読み込みに失敗：{}", e);
                continue;
            }
        };

        let stm = match &group.data {
            GroupData::Management(md) => {
                for lang in &md.languages {
                    println!(
                        "[管理] {} 言語{} {} {:?} {:?}",
                        format_time(md.otm),
                        lang.language_tag,
                        lang.lang_code,
                        lang.format,
                        lang.rollup_mode,
                    );
                }
                continue;
            }
            GroupData::Statement(sd) => sd.stm,
        };

        for unit in group.data.data_units() {
            let DataUnitBody::StatementBody(body) = &unit.body else {
                continue;
            };

            let text = body.text();
            if !text.is_empty() {
                println!("[{}] {}", format_time(stm), text.replace('\n', "⏎"));
            }
            if let Some(e) = &body.aborted {
                log::warn!("字幕文の途中でデコードを中断：{}", e);
            }
        }
    }

    Ok(())
}
