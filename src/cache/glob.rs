/// Redis `KEYS`/`SCAN MATCH` glob: `*`, `?`, `[abc]`, `[a-z]`, `[^x]`, `\` escapes.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let k: Vec<char> = key.chars().collect();
    let (mut pi, mut ki) = (0usize, 0usize);
    // Position after the last `*` and the key index it was tried against.
    let mut backtrack: Option<(usize, usize)> = None;

    while ki < k.len() {
        if pi < p.len() {
            match p[pi] {
                '*' => {
                    backtrack = Some((pi + 1, ki));
                    pi += 1;
                    continue;
                }
                '?' => {
                    pi += 1;
                    ki += 1;
                    continue;
                }
                '[' => {
                    let (matched, next) = match_class(&p, pi, k[ki]);
                    if matched {
                        pi = next;
                        ki += 1;
                        continue;
                    }
                }
                '\\' if pi + 1 < p.len() => {
                    if p[pi + 1] == k[ki] {
                        pi += 2;
                        ki += 1;
                        continue;
                    }
                }
                c => {
                    if c == k[ki] {
                        pi += 1;
                        ki += 1;
                        continue;
                    }
                }
            }
        }
        match backtrack {
            Some((star_next, star_key)) => {
                pi = star_next;
                ki = star_key + 1;
                backtrack = Some((star_next, star_key + 1));
            }
            None => return false,
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}

/// Match `c` against the class opening at `p[start] == '['`.
/// Returns whether it matched and the index after the closing `]`. As in
/// Redis, `]` always closes the class (so `[]` is empty) and an unterminated
/// class runs to the end of the pattern.
fn match_class(p: &[char], start: usize, c: char) -> (bool, usize) {
    let mut i = start + 1;
    let negate = p.get(i) == Some(&'^');
    if negate {
        i += 1;
    }
    let mut matched = false;
    while let Some(&ch) = p.get(i) {
        if ch == '\\' && i + 1 < p.len() {
            matched |= p[i + 1] == c;
            i += 2;
        } else if ch == ']' {
            i += 1;
            break;
        } else if i + 2 < p.len() && p[i + 1] == '-' {
            let (lo, hi) = if ch <= p[i + 2] { (ch, p[i + 2]) } else { (p[i + 2], ch) };
            matched |= lo <= c && c <= hi;
            i += 3;
        } else {
            matched |= ch == c;
            i += 1;
        }
    }
    (matched != negate, i)
}
