use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use aribcc::caption::DataUnitBody;
use aribcc::drcs::DrcsGlyph;
use aribcc::{ByteCursor, Session};
use fxhash::FxHashSet;

#[derive(Debug)]
struct AppArgs {
    input: PathBuf,
    output: Option<PathBuf>,
}

impl AppArgs {
    const HELP: &str = "\
字幕のデータグループからDRCSを抽出して表示・保存するコマンド

USAGE:
  drcs [OPTIONS] [PATH]

FLAGS:
  -h, --help     このヘルプを表示する

OPTIONS:
  --output PATH  DRCSをPNGとして出力するディレクトリ

ARGS:
  <PATH>         データグループを並べたファイルのパス
";

    pub fn parse() -> Result<AppArgs, Box<dyn std::error::Error>> {
        let mut args = pico_args::Arguments::from_env();

        if args.contains(["-h", "--help"]) {
            println!("{}", Self::HELP);
            std::process::exit(0);
        }

        let output = args.opt_value_from_str("--output")?;

        Ok(AppArgs {
            input: args.free_from_str()?,
            output,
        })
    }
}

fn save(glyph: &DrcsGlyph, path: &std::path::Path) {
    let Some(pixels) = glyph.pixels() else {
        log::warn!("知らない階調だ・・・：{}", glyph.depth);
        return;
    };
    let max = (1u16 << glyph.depth) - 1;

    let image = image::ImageBuffer::from_fn(glyph.width as u32, glyph.height as u32, |x, y| {
        let p = (x + y * glyph.width as u32) as usize;
        image::LumaA([0, (pixels[p] as u16 * 255 / max) as u8])
    });
    match image.save_with_format(path, image::ImageFormat::Png) {
        Ok(()) => println!("'{}'へDRCSを保存", path.display()),
        Err(e) => log::error!("'{}'へのDRCSの保存に失敗：{}", path.display(), e),
    }
}

fn print(glyph: &DrcsGlyph) {
    let Some(pixels) = glyph.pixels() else {
        log::warn!("知らない階調だ・・・：{}", glyph.depth);
        return;
    };

    for row in pixels.chunks(glyph.width.max(1) as usize) {
        for &p in row {
            print!("{}", if p > 0 { "■" } else { "□" });
        }
        println!();
    }
    println!();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = AppArgs::parse()?;

    env_logger::init();

    let f = File::open(&*args.input)?;
    let mut cursor = ByteCursor::new(BufReader::new(f));
    let mut session = Session::default();
    let mut patterns = FxHashSet::default();

    for group in session.data_groups(&mut cursor) {
        let group = match group {
            Ok(group) => group,
            Err(e) => {
                log::error!("データグループの読み込みに失敗：{}", e);
                continue;
            }
        };

        for unit in group.data.data_units() {
            let DataUnitBody::Drcs(chars) = &unit.body else {
                continue;
            };

            for c in chars {
                for (i, glyph) in c.fonts.iter().enumerate() {
                    // ヒープの無駄な使用を抑えるためにcontainsとinsertを分ける
                    if patterns.contains(&glyph.pattern) {
                        continue;
                    }
                    patterns.insert(glyph.pattern.clone());

                    if let Some(output) = &args.output {
                        let path = output.join(format!(
                            "DRCS{}_{:04X}_{}_{}.png",
                            c.set,
                            c.code,
                            i + 1,
                            patterns.len(),
                        ));
                        save(glyph, &path);
                    } else {
                        println!(
                            "DRCS-{} {:04X}[{}] - {}x{}",
                            c.set,
                            c.code,
                            i + 1,
                            glyph.width,
                            glyph.height,
                        );
                        print(glyph);
                    }
                }
            }
        }
    }

    Ok(())
}
