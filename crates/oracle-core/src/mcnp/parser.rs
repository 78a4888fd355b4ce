use super::model::McnpInput;
use crate::domain::{CellSignature, OracleError, OracleResult};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Cell cards start within the first five columns; anything indented further
/// continues the previous card.
const CELL_COLUMN_LIMIT: usize = 5;

/// Single-pass reader for the cell block and the `NPS` card of an MCNP deck.
#[derive(Debug)]
pub struct McnpInputParser<R> {
    inner: R,
}

impl McnpInputParser<BufReader<File>> {
    pub fn open(path: &Path) -> OracleResult<Self> {
        let file = File::open(path).map_err(|source| {
            OracleError::io_system(
                "IO.MCNP_OPEN",
                format!("failed to open MCNP input '{}': {}", path.display(), source),
            )
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Message,
    Cells,
    Rest,
}

impl<R: BufRead> McnpInputParser<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn parse(self) -> OracleResult<McnpInput> {
        let mut input = McnpInput::default();
        let mut section = Section::Cells;
        let mut saw_content = false;

        for (index, line) in self.inner.lines().enumerate() {
            let line_number = index + 1;
            let line = line.map_err(|source| {
                OracleError::io_system(
                    "IO.MCNP_READ",
                    format!("failed to read MCNP input line {}: {}", line_number, source),
                )
            })?;
            let blank = line.trim().is_empty();

            match section {
                Section::Message => {
                    if blank {
                        section = Section::Cells;
                    }
                }
                Section::Cells => {
                    if blank {
                        if saw_content {
                            section = Section::Rest;
                        }
                        continue;
                    }
                    if !saw_content && is_message_header(&line) {
                        section = Section::Message;
                        continue;
                    }
                    saw_content = true;
                    if is_comment(&line) || !is_cell_card(&line) {
                        continue;
                    }
                    let (cell_id, signature) = associate_cell(&input, &line, line_number)?;
                    input.register_cell(cell_id, signature);
                }
                Section::Rest => {
                    if input.nps.is_some() || blank || is_comment(&line) {
                        continue;
                    }
                    input.nps = find_nps(&line);
                }
            }
        }

        tracing::info!(
            cells = input.cell_count(),
            nps = ?input.nps,
            "parsed MCNP input"
        );
        Ok(input)
    }
}

pub fn parse_mcnp_source(source: &str) -> OracleResult<McnpInput> {
    McnpInputParser::new(source.as_bytes()).parse()
}

pub fn parse_mcnp_file(path: &Path) -> OracleResult<McnpInput> {
    McnpInputParser::open(path)?.parse()
}

fn is_message_header(line: &str) -> bool {
    line.trim_start()
        .get(..8)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("message:"))
}

/// `c` or `C` as the first non-blank character within the card columns,
/// followed by a blank or the end of the line.
pub fn is_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    let indentation = line.len() - trimmed.len();
    let mut characters = trimmed.chars();
    indentation < CELL_COLUMN_LIMIT
        && matches!(characters.next(), Some('c' | 'C'))
        && characters.next().is_none_or(char::is_whitespace)
}

fn is_cell_card(line: &str) -> bool {
    line.char_indices()
        .find(|(_, character)| !character.is_whitespace())
        .is_some_and(|(column, character)| column < CELL_COLUMN_LIMIT && character.is_ascii_digit())
}

/// Strips trailing zeros of a decimal density while keeping at least one
/// digit after the point: `1.250` -> `1.25`, `1.000` -> `1.0`.
pub fn normalize_density(token: &str) -> String {
    let has_exponent = token.contains(['e', 'E', 'd', 'D']);
    if !token.contains('.') || has_exponent {
        return token.to_string();
    }

    let mut normalized = token.trim_end_matches('0').to_string();
    if normalized.ends_with('.') {
        normalized.push('0');
    }
    normalized
}

fn associate_cell(
    input: &McnpInput,
    line: &str,
    line_number: usize,
) -> OracleResult<(u32, CellSignature)> {
    let card = collapse_assignments(strip_inline_comment(line));
    let tokens = card.split_whitespace().collect::<Vec<_>>();

    let cell_id = parse_id(tokens[0], "cell number", line, line_number)?;

    if let Some(like_index) = find_like_but(&tokens) {
        let base_id = parse_id(tokens[like_index + 1], "LIKE reference", line, line_number)?;
        let base = input.signature(base_id).ok_or_else(|| {
            OracleError::input_validation(
                "INPUT.MCNP_LIKE_REFERENCE",
                format!(
                    "line {}: cell {} is LIKE cell {}, which is not defined before it: '{}'",
                    line_number,
                    cell_id,
                    base_id,
                    line.trim()
                ),
            )
        })?;

        let mut signature = base.clone();
        for token in &tokens[like_index + 3..] {
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };
            if key.eq_ignore_ascii_case("mat") {
                signature.material_id = parse_id(value, "material override", line, line_number)?;
            } else if key.eq_ignore_ascii_case("rho") {
                signature.density = value.to_string();
            }
        }
        if signature.is_void() {
            signature = CellSignature::void();
        }
        return Ok((cell_id, signature));
    }

    let material_token = tokens.get(1).copied().ok_or_else(|| {
        card_error(
            "INPUT.MCNP_CELL",
            line,
            line_number,
            "cell card has no material number",
        )
    })?;
    let material_id = parse_id(material_token, "material number", line, line_number)?;
    if material_id == 0 {
        return Ok((cell_id, CellSignature::void()));
    }

    let density = tokens
        .get(2)
        .copied()
        .filter(|token| token.parse::<f64>().is_ok_and(f64::is_finite))
        .ok_or_else(|| {
            card_error(
                "INPUT.MCNP_DENSITY",
                line,
                line_number,
                "density is not a finite floating-point number",
            )
        })?;

    Ok((
        cell_id,
        CellSignature::new(material_id, normalize_density(density)),
    ))
}

fn find_like_but(tokens: &[&str]) -> Option<usize> {
    tokens.windows(3).position(|window| {
        window[0].eq_ignore_ascii_case("like") && window[2].eq_ignore_ascii_case("but")
    })
}

fn find_nps(line: &str) -> Option<u64> {
    let tokens = strip_inline_comment(line)
        .split_whitespace()
        .collect::<Vec<_>>();
    tokens.windows(2).find_map(|window| {
        if !window[0].eq_ignore_ascii_case("nps") {
            return None;
        }
        let value = window[1].replace(['D', 'd'], "E").parse::<f64>().ok()?;
        (value.is_finite() && value >= 0.0).then(|| value.trunc() as u64)
    })
}

fn strip_inline_comment(line: &str) -> &str {
    line.split_once('$').map_or(line, |(card, _)| card)
}

/// `rho = -3.0` and `rho= -3.0` become `rho=-3.0`.
fn collapse_assignments(card: &str) -> String {
    let mut collapsed = String::with_capacity(card.len());
    let mut characters = card.chars().peekable();
    while let Some(character) = characters.next() {
        if character == '=' {
            let kept = collapsed.trim_end().len();
            collapsed.truncate(kept);
            collapsed.push('=');
            while characters.next_if(|next| next.is_whitespace()).is_some() {}
        } else {
            collapsed.push(character);
        }
    }
    collapsed
}

fn parse_id(token: &str, field: &str, line: &str, line_number: usize) -> OracleResult<u32> {
    token.parse::<u32>().map_err(|_| {
        card_error(
            "INPUT.MCNP_CELL",
            line,
            line_number,
            &format!("invalid {} '{}'", field, token),
        )
    })
}

fn card_error(
    placeholder: &'static str,
    line: &str,
    line_number: usize,
    message: &str,
) -> OracleError {
    OracleError::input_validation(
        placeholder,
        format!("line {}: {}: '{}'", line_number, message, line.trim()),
    )
}
