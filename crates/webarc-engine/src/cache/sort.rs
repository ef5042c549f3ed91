//! External merge sort of newline-separated lines in byte order

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Bytes of lines held in memory per sorted run
pub const DEFAULT_RUN_BYTES: usize = 64 * 1024 * 1024;

fn read_line(reader: &mut impl BufRead) -> io::Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line)? == 0 {
        return Ok(None);
    }
    if line.ends_with(b"\n") {
        line.pop();
    }
    Ok(Some(line))
}

fn write_run(lines: &mut Vec<Vec<u8>>, path: &Path) -> io::Result<()> {
    lines.sort_unstable();
    let mut out = BufWriter::new(File::create(path)?);
    for line in lines.drain(..) {
        out.write_all(&line)?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

fn run_path(output: &Path, index: usize) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(format!(".run-{}", index));
    PathBuf::from(name)
}

/// Sort the lines of `input` into `output`; duplicates are kept
///
/// Run files are always removed. On error `output` is removed as well.
pub fn sort_file(input: &Path, output: &Path, run_bytes: usize) -> io::Result<usize> {
    let mut runs = Vec::new();
    let sorted = sort_into(input, output, run_bytes, &mut runs);
    for run in &runs {
        let _ = fs::remove_file(run);
    }
    if sorted.is_err() {
        let _ = fs::remove_file(output);
    }
    sorted
}

fn sort_into(
    input: &Path,
    output: &Path,
    run_bytes: usize,
    runs: &mut Vec<PathBuf>,
) -> io::Result<usize> {
    let mut reader = BufReader::new(File::open(input)?);
    let mut lines = Vec::new();
    let mut held = 0usize;
    let mut total = 0usize;

    while let Some(line) = read_line(&mut reader)? {
        held += line.len() + 1;
        total += 1;
        lines.push(line);
        if held >= run_bytes {
            let path = run_path(output, runs.len());
            runs.push(path.clone());
            write_run(&mut lines, &path)?;
            held = 0;
        }
    }

    if runs.is_empty() {
        write_run(&mut lines, output)?;
        return Ok(total);
    }
    if !lines.is_empty() {
        let path = run_path(output, runs.len());
        runs.push(path.clone());
        write_run(&mut lines, &path)?;
    }

    debug!(runs = runs.len(), lines = total, "Merging sorted runs");
    merge_runs(runs.as_slice(), output)?;
    Ok(total)
}

fn merge_runs(runs: &[PathBuf], output: &Path) -> io::Result<()> {
    let mut readers = runs
        .iter()
        .map(|path| File::open(path).map(BufReader::new))
        .collect::<io::Result<Vec<_>>>()?;

    let mut heap = BinaryHeap::new();
    for (index, reader) in readers.iter_mut().enumerate() {
        if let Some(line) = read_line(reader)? {
            heap.push(Reverse((line, index)));
        }
    }

    let mut out = BufWriter::new(File::create(output)?);
    while let Some(Reverse((line, index))) = heap.pop() {
        out.write_all(&line)?;
        out.write_all(b"\n")?;
        if let Some(next) = read_line(&mut readers[index])? {
            heap.push(Reverse((next, index)));
        }
    }
    out.flush()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const INPUT: &str = "b 2\nB 1\na 3\nb 2\n\u{e9} 4\nA 0\n";
    const SORTED: &str = "A 0\nB 1\na 3\nb 2\nb 2\n\u{e9} 4\n";

    #[test]
    fn test_sort_in_memory() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::write(&input, INPUT).unwrap();

        assert_eq!(sort_file(&input, &output, DEFAULT_RUN_BYTES).unwrap(), 6);
        assert_eq!(fs::read_to_string(&output).unwrap(), SORTED);
    }

    #[test]
    fn test_sort_with_merged_runs() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::write(&input, INPUT).unwrap();

        sort_file(&input, &output, 5).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), SORTED);
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 2);
    }

    #[test]
    fn test_failed_sort_leaves_no_files_behind() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::write(&input, INPUT).unwrap();
        // A directory where the second run belongs makes the sort fail part way.
        fs::create_dir(run_path(&output, 1)).unwrap();

        assert!(sort_file(&input, &output, 1).is_err());

        let mut left: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        left.sort();
        assert_eq!(left, vec!["in", "out.run-1"]);
    }

    #[test]
    fn test_sort_empty_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::write(&input, "").unwrap();
        assert_eq!(sort_file(&input, &output, DEFAULT_RUN_BYTES).unwrap(), 0);
        assert_eq!(fs::read(&output).unwrap(), b"");
    }
}
