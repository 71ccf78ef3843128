use timeline_api::RoundMode;

/// Rounds `pos` onto a series of lines.
///
/// `line(k)` returns the position of the k-th line and must not decrease with `k`. `k` is the
/// index of the line at or below `pos`, so `line(k) <= pos <= line(k + 1)`.
///
/// This is the only rounding rule. Clock scales, beat subdivisions and bars just differ in how
/// their lines are laid out.
pub fn round_to_line(pos: i64, mode: RoundMode, k: i64, line: impl Fn(i64) -> i64) -> i64 {
    let mut k = k;
    let mut lower = line(k);
    let mut upper = line(k + 1);
    if upper == pos {
        // Fractional line spacing can put the next line exactly onto pos.
        k += 1;
        lower = upper;
        upper = line(k + 1);
    }
    if lower == pos {
        return match mode {
            RoundMode::DownAlways => line(k - 1),
            RoundMode::UpAlways => upper,
            _ => pos,
        };
    }
    match mode.direction() {
        d if d < 0 => lower,
        d if d > 0 => upper,
        _ => {
            if (pos - lower) * 2 > upper - lower {
                upper
            } else {
                lower
            }
        }
    }
}
