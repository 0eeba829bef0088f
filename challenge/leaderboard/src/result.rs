//! 排行榜输出: 终端文本, CSV 与 JSON.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use mr_berry::prelude::*;

use crate::error::AppError;
use crate::ScoreArgs;

/// CSV 文件名.
pub const CSV_NAME: &str = "leaderboard.csv";

const S4: &str = "    ";

#[inline]
fn f64_to_display(f: Option<f64>) -> String {
    match f {
        Some(f) => format!("{f:.6}"),
        None => "/".to_string(),
    }
}

/// 将名次为 `rank` 的记录 `r` 写进 `w` 中.
fn describe_into<W: Write>(rank: usize, r: &ParticipantRecord, w: &mut W) -> io::Result<()> {
    writeln!(w, "#{rank} `{}`:", r.id())?;
    for m in Metric::ALL {
        let mean = r.metric_mean(m);
        write!(w, "{S4}{}: {}", m.name(), f64_to_display(mean.value))?;
        if mean.dropped > 0 {
            write!(w, " ({} non-finite dropped)", mean.dropped)?;
        }
        writeln!(w)?;
    }
    writeln!(w, "{S4}Final score: {}", f64_to_display(r.final_score()))?;
    write!(
        w,
        "{S4}Samples: {} scored, {} unavailable",
        r.sample_count(),
        r.unavailable()
    )?;
    Ok(())
}

/// 以 CSV 写出排行榜. 不可用的值留空.
pub fn write_csv<W: Write>(table: &LeaderboardTable, w: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(w);
    for row in table.rows() {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// 以 JSON 写出排行榜. 不可用的值写为 `null`.
pub fn write_json<W: Write>(table: &LeaderboardTable, w: W) -> serde_json::Result<()> {
    let rows: Vec<LeaderboardRow> = table.rows().collect();
    serde_json::to_writer_pretty(w, &rows)
}

/// 在终端打印排行榜.
pub fn print(table: &LeaderboardTable) {
    utils::sep();
    println!("Leaderboard ranked by {:?}:", table.key());
    utils::sep();
    if table.is_empty() {
        println!("(no participant has a valid sample)");
        utils::sep();
        return;
    }

    let mut buf = Vec::with_capacity(512);
    for (i, r) in table.records().iter().enumerate() {
        // 写入内存不会失败.
        let _ = describe_into(i + 1, r, &mut buf);
        println!("{}", String::from_utf8_lossy(&buf));
        buf.clear();

        utils::sep();
    }
}

/// 输出全部结果.
pub fn report(table: &LeaderboardTable, args: &ScoreArgs) -> Result<(), AppError> {
    print(table);

    fs::create_dir_all(&args.out_dir).map_err(AppError::io(&args.out_dir))?;
    let path = args.out_dir.join(CSV_NAME);
    save(&path, |f| {
        write_csv(table, f).map_err(|source| AppError::Csv {
            path: path.clone(),
            source,
        })
    })?;
    log::info!("Leaderboard saved to `{}`", path.display());

    if let Some(path) = &args.json {
        save(path, |f| {
            write_json(table, f).map_err(|source| AppError::Json {
                path: path.clone(),
                source,
            })
        })?;
        log::info!("Leaderboard saved to `{}`", path.display());
    }
    Ok(())
}

fn save<F>(path: &Path, op: F) -> Result<(), AppError>
where
    F: FnOnce(io::BufWriter<File>) -> Result<(), AppError>,
{
    let f = File::create(path).map_err(AppError::io(path))?;
    op(io::BufWriter::new(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LeaderboardTable {
        let agg =
            ScoreAggregator::new(ScoringVariant::RawPsnr).with_policy(NonFinitePolicy::Exclude);
        let mut records = Vec::new();
        for (id, ssim, psnr) in [("b", 0.5, 30.0), ("a", 0.9, f64::INFINITY)] {
            let mut s = ParticipantSamples::new(id);
            s.push(MetricSample {
                ssim,
                psnr,
                mae: 0.05,
                nmse: 0.02,
            });
            s.mark_unavailable();
            records.extend(agg.finalize(s));
        }
        LeaderboardTable::new(RankKey::Ssim, records)
    }

    #[test]
    fn test_describe() {
        let t = table();
        let mut buf = Vec::new();
        describe_into(1, &t.records()[0], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("#1 `a`:"));
        assert!(text.contains("    SSIM: 0.900000"));
        assert!(text.contains("    PSNR: / (1 non-finite dropped)"));
        assert!(text.contains("    Final score: /"));
        assert!(text.ends_with("Samples: 1 scored, 1 unavailable"));
    }

    #[test]
    fn test_csv() {
        let mut buf = Vec::new();
        write_csv(&table(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "rank,participant,ssim,psnr,mae,nmse,final_score,samples,unavailable"
        );
        assert!(lines[1].starts_with("1,a,0.9,,0.05,0.02,,1,1"));
        assert!(lines[2].starts_with("2,b,0.5,30.0,0.05,0.02,3.54"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_json() {
        let mut buf = Vec::new();
        write_json(&table(), &mut buf).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(v[0]["participant"], "a");
        assert!(v[0]["psnr"].is_null());
        assert_eq!(v[1]["rank"], 2);
        assert_eq!(v[1]["psnr"], 30.0);
    }
}
