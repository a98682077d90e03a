use tegra_core::{Reading, Snapshot};

/// Parse one tegrastats line into whatever device readings it carries.
///
/// Each extractor runs independently, so a line without GPU data still yields
/// RAM and CPU readings. The returned snapshot has no timestamp.
///
/// A typical line looks like
/// `RAM 2072/3964MB (lfb 6x4MB) CPU [23%@102,off,45%@102,12%@102] GR3D_FREQ 18%@76`.
pub fn parse_line(line: &str) -> Snapshot {
    Snapshot {
        ram: parse_memory(line),
        cpu: parse_cpu(line),
        gpu: parse_gpu(line),
        updated_at: None,
    }
}

/// `RAM <used>/<total><K|M|G>B` → `Reading { used, max: total }`.
///
/// Only the start of the value token has to match, so `1234/7854MB(lfb` is
/// accepted.
pub fn parse_memory(line: &str) -> Option<Reading> {
    values_after(line, "RAM").find_map(|value| {
        let (used, rest) = split_digits(value);
        let (total, rest) = split_digits(rest.strip_prefix('/')?);
        rest.strip_prefix(['K', 'M', 'G'])?.strip_prefix('B')?;
        Some(Reading::new(parse_uint(used)?, parse_uint(total)?))
    })
}

/// `CPU [<core>,<core>,...]` → mean load of the cores that are not `off`.
///
/// Returns `None` when no core is active, which is distinct from 0% load.
pub fn parse_cpu(line: &str) -> Option<Reading> {
    let cores = values_after(line, "CPU").find_map(|value| {
        let inner = value.strip_prefix('[')?;
        let end = inner.rfind(']')?;
        Some(&inner[..end])
    })?;

    let (active, total) = cores
        .split(',')
        .filter(|core| *core != "off")
        .filter_map(find_percent)
        .fold((0u32, 0.0), |(n, sum), load| (n + 1, sum + load));

    (active > 0).then(|| Reading::percent(total / f64::from(active)))
}

/// `GR3D_FREQ <percent>%` → `Reading { used: percent, max: 100 }`.
pub fn parse_gpu(line: &str) -> Option<Reading> {
    values_after(line, "GR3D_FREQ")
        .find_map(leading_percent)
        .map(Reading::percent)
}

/// Every token that directly follows a `key` token.
fn values_after<'a>(line: &'a str, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    let mut prev: Option<&str> = None;
    line.split_whitespace().filter_map(move |token| {
        let hit = prev == Some(key);
        prev = Some(token);
        hit.then_some(token)
    })
}

/// Split `s` after its leading run of ASCII digits.
fn split_digits(s: &str) -> (&str, &str) {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    s.split_at(digits)
}

/// A non-empty run of ASCII digits. `str::parse` alone would accept a sign.
/// Parsed as `f64` so runs wider than `u64` still yield a value.
fn parse_uint(s: &str) -> Option<f64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<f64>().ok()
}

/// Digits at the start of `s` immediately followed by `%`, e.g. `18%@76`.
fn leading_percent(s: &str) -> Option<f64> {
    let (digits, rest) = split_digits(s);
    if rest.starts_with('%') {
        parse_uint(digits)
    } else {
        None
    }
}

/// The first `<digits>%` anywhere in `s`.
fn find_percent(s: &str) -> Option<f64> {
    s.match_indices('%').find_map(|(pos, _)| {
        let head = &s[..pos];
        let digits = head.bytes().rev().take_while(u8::is_ascii_digit).count();
        parse_uint(&head[pos - digits..])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "RAM 2072/3964MB (lfb 6x4MB) SWAP 0/1982MB (cached 0MB) \
                        CPU [23%@102,off,45%@102,12%@102] EMC_FREQ 0% GR3D_FREQ 18%@76 \
                        APE 25 PLL@41C CPU@43.5C";

    #[test]
    fn full_line_yields_all_devices() {
        let snap = parse_line(FULL);
        assert_eq!(snap.ram, Some(Reading::new(2072.0, 3964.0)));
        assert_eq!(snap.cpu, Some(Reading::percent((23.0 + 45.0 + 12.0) / 3.0)));
        assert_eq!(snap.gpu, Some(Reading::percent(18.0)));
        assert!(snap.updated_at.is_none());
    }

    #[test]
    fn memory_units() {
        assert_eq!(parse_memory("RAM 1234/7854MB"), Some(Reading::new(1234.0, 7854.0)));
        assert_eq!(parse_memory("RAM 12/64GB"), Some(Reading::new(12.0, 64.0)));
        assert_eq!(parse_memory("RAM 900/4000KB"), Some(Reading::new(900.0, 4000.0)));
        assert_eq!(parse_memory("RAM 900/4000TB"), None);
        assert_eq!(parse_memory("RAM 900/4000"), None);
    }

    #[test]
    fn memory_value_may_run_into_next_field() {
        assert_eq!(
            parse_memory("RAM 1234/7854MB(lfb 4x4MB)"),
            Some(Reading::new(1234.0, 7854.0))
        );
        assert_eq!(parse_memory("RAM /7854MB"), None);
        assert_eq!(parse_memory("RAM 1234/MB"), None);
    }

    #[test]
    fn digit_runs_wider_than_u64_still_parse() {
        let huge = "RAM 1/100000000000000000000000MB";
        assert_eq!(parse_memory(huge), Some(Reading::new(1.0, 1e23)));
        assert_eq!(parse_gpu("GR3D_FREQ 100000000000000000000%"), Some(Reading::percent(1e20)));
    }

    #[test]
    fn memory_absent_without_ram_token() {
        assert_eq!(parse_memory("CPU [20%,40%] GR3D_FREQ 0%"), None);
        assert_eq!(parse_memory("SWAP 0/1982MB"), None);
    }

    #[test]
    fn memory_skips_malformed_first_occurrence() {
        assert_eq!(
            parse_memory("RAM n/a RAM 10/20MB"),
            Some(Reading::new(10.0, 20.0))
        );
    }

    #[test]
    fn cpu_averages_active_cores() {
        assert_eq!(parse_cpu("CPU [20%,40%]"), Some(Reading::percent(30.0)));
        assert_eq!(parse_cpu("CPU [23%,off,45%,12%]"), Some(Reading::percent(80.0 / 3.0)));
    }

    #[test]
    fn cpu_all_off_is_absent() {
        assert_eq!(parse_cpu("CPU [off,off]"), None);
    }

    #[test]
    fn cpu_zero_load_is_present() {
        assert_eq!(parse_cpu("CPU [0%,0%]"), Some(Reading::percent(0.0)));
    }

    #[test]
    fn cpu_ignores_tokens_without_percent() {
        assert_eq!(parse_cpu("CPU [garbage,50%@1420]"), Some(Reading::percent(50.0)));
        assert_eq!(parse_cpu("CPU [garbage]"), None);
        assert_eq!(parse_cpu("CPU 50%"), None);
    }

    #[test]
    fn gpu_percent() {
        assert_eq!(parse_gpu("GR3D_FREQ 0%"), Some(Reading::percent(0.0)));
        assert_eq!(parse_gpu("GR3D_FREQ 99%@1300"), Some(Reading::percent(99.0)));
        assert_eq!(parse_gpu("GR3D_FREQ 99"), None);
        assert_eq!(parse_gpu("GR3D_FREQ"), None);
    }

    #[test]
    fn truncated_line_keeps_earlier_fields() {
        let snap = parse_line("RAM 1300/7854MB (lfb 4x4MB) CPU [20%,4");
        assert_eq!(snap.ram, Some(Reading::new(1300.0, 7854.0)));
        assert_eq!(snap.cpu, None);
        assert_eq!(snap.gpu, None);
    }

    #[test]
    fn unrelated_text_yields_nothing() {
        assert!(parse_line("").is_empty());
        assert!(parse_line("tegrastats: permission denied").is_empty());
    }
}
