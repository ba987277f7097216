use std::io::{self, BufRead, Write};

use chrono::{Datelike as _, NaiveDate};
use thiserror::Error;

use crate::catalog::{Catalog, CatalogCandidate, CatalogError};
use crate::comicinfo::ComicInfo;
use crate::credits::aggregate_credits;
use crate::description::{DescriptionError, parse_description, summarize};
use crate::filename::SearchTerms;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("read candidate choice: {0}")]
    Prompt(#[from] io::Error),

    #[error("choice {choice} is out of range (1..={available})")]
    InvalidChoice { choice: usize, available: usize },

    #[error("candidate {id}: {source}")]
    Description {
        id: u64,
        source: DescriptionError,
    },
}

impl ResolveError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Catalog(err) if err.is_not_found())
    }
}

/// Operator decision for one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// 1-based position in the catalog's result order.
    Pick(usize),
    Skip,
}

/// Picks one candidate out of a search result list.
pub trait Chooser {
    fn choose(&mut self, query: &str, candidates: &[CatalogCandidate]) -> io::Result<Choice>;
}

impl<T: Chooser + ?Sized> Chooser for &mut T {
    fn choose(&mut self, query: &str, candidates: &[CatalogCandidate]) -> io::Result<Choice> {
        (**self).choose(query, candidates)
    }
}

/// Always takes the catalog's top-ranked candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstMatchChooser;

impl Chooser for FirstMatchChooser {
    fn choose(&mut self, query: &str, candidates: &[CatalogCandidate]) -> io::Result<Choice> {
        tracing::info!(query, candidates = candidates.len(), "auto-selecting first candidate");
        Ok(if candidates.is_empty() {
            Choice::Skip
        } else {
            Choice::Pick(1)
        })
    }
}

/// Lists candidates on `output` and reads a number from `input`, asking again
/// until the answer is valid. `0` skips.
#[derive(Debug)]
pub struct TerminalChooser<R, W> {
    input: R,
    output: W,
}

impl TerminalChooser<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalChooser<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn list(&mut self, query: &str, candidates: &[CatalogCandidate]) -> io::Result<()> {
        writeln!(self.output, "Issue name entered: {query}")?;
        writeln!(self.output, "Search Results:")?;
        for (idx, candidate) in candidates.iter().enumerate() {
            let name = or_placeholder(&candidate.name, "(No issue title available)");
            let volume = or_placeholder(&candidate.volume.name, "(No volume name available)");
            writeln!(
                self.output,
                "{}: {volume} -- Issue Number: #{} -- {name}",
                idx + 1,
                candidate.issue_number
            )?;
            writeln!(self.output, "    Site detail URL: {}", candidate.site_detail_url)?;
            writeln!(
                self.output,
                "       Volume detail URL: {}",
                candidate.volume.site_detail_url
            )?;
        }
        Ok(())
    }
}

impl<R: BufRead, W: Write> Chooser for TerminalChooser<R, W> {
    fn choose(&mut self, query: &str, candidates: &[CatalogCandidate]) -> io::Result<Choice> {
        self.list(query, candidates)?;
        loop {
            write!(
                self.output,
                "Enter the number of the correct issue (or 0 to skip): "
            )?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "input closed before a candidate was chosen",
                ));
            }

            match line.trim().parse::<usize>() {
                Ok(0) => return Ok(Choice::Skip),
                Ok(n) if n <= candidates.len() => return Ok(Choice::Pick(n)),
                _ => writeln!(
                    self.output,
                    "Invalid input. Please enter a number between 0 and {}.",
                    candidates.len()
                )?,
            }
        }
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The chosen candidate, with its credits filled in.
    Selected(CatalogCandidate),
    Skipped,
}

/// Turns search terms into exactly one catalog candidate (or a skip).
pub struct Resolver<C, P> {
    catalog: C,
    chooser: P,
}

impl<C: Catalog, P: Chooser> Resolver<C, P> {
    pub fn new(catalog: C, chooser: P) -> Self {
        Self { catalog, chooser }
    }

    pub fn resolve(&mut self, terms: &SearchTerms) -> Result<Resolution, ResolveError> {
        let query = terms.query();
        let mut candidates = self.catalog.search(&query)?;
        tracing::info!(%query, candidates = candidates.len(), "catalog search");

        let index = match self.chooser.choose(&query, &candidates)? {
            Choice::Skip => return Ok(Resolution::Skipped),
            Choice::Pick(n) if (1..=candidates.len()).contains(&n) => n - 1,
            Choice::Pick(n) => {
                return Err(ResolveError::InvalidChoice {
                    choice: n,
                    available: candidates.len(),
                });
            }
        };

        let mut candidate = candidates.swap_remove(index);
        candidate.credits = self.catalog.fetch_credits(candidate.id)?;
        tracing::debug!(
            id = candidate.id,
            credits = candidate.credits.len(),
            "fetched candidate credits"
        );
        Ok(Resolution::Selected(candidate))
    }
}

/// Shapes a resolved candidate into a full record.
pub fn record_from_candidate(candidate: &CatalogCandidate) -> Result<ComicInfo, ResolveError> {
    let doc = parse_description(&candidate.description).map_err(|source| {
        ResolveError::Description {
            id: candidate.id,
            source,
        }
    })?;
    let credits = aggregate_credits(&candidate.credits);

    let date = [&candidate.cover_date, &candidate.store_date]
        .into_iter()
        .find_map(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok());

    Ok(ComicInfo {
        title: candidate.name.clone(),
        series: candidate.volume.name.clone(),
        number: candidate.issue_number.clone(),
        summary: summarize(&doc),
        year: date.map(|d| d.year()),
        month: date.map(|d| d.month()),
        day: date.map(|d| d.day()),
        writer: credits.writer,
        penciller: credits.penciller,
        inker: credits.inker,
        colorist: credits.colorist,
        letterer: credits.letterer,
        cover_artist: credits.cover_artist,
        editor: credits.editor,
        ..ComicInfo::default()
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::Cursor;

    use super::*;
    use crate::credits::CreditEntry;

    struct FakeCatalog {
        results: Vec<CatalogCandidate>,
        credits: Vec<CreditEntry>,
        credit_calls: RefCell<Vec<u64>>,
    }

    impl Catalog for FakeCatalog {
        fn search(&self, query: &str) -> Result<Vec<CatalogCandidate>, CatalogError> {
            if self.results.is_empty() {
                return Err(CatalogError::NoResults {
                    query: query.to_owned(),
                });
            }
            Ok(self.results.clone())
        }

        fn fetch_credits(&self, issue_id: u64) -> Result<Vec<CreditEntry>, CatalogError> {
            self.credit_calls.borrow_mut().push(issue_id);
            Ok(self.credits.clone())
        }
    }

    fn candidate(id: u64, volume: &str, issue: &str) -> CatalogCandidate {
        let mut c = CatalogCandidate {
            id,
            issue_number: issue.to_owned(),
            ..CatalogCandidate::default()
        };
        c.volume.name = volume.to_owned();
        c
    }

    fn terms() -> SearchTerms {
        SearchTerms {
            title: "Batman".to_owned(),
            issue: "5".to_owned(),
        }
    }

    fn fake(results: Vec<CatalogCandidate>) -> FakeCatalog {
        FakeCatalog {
            results,
            credits: vec![CreditEntry {
                id: 1,
                name: "Scott Snyder".to_owned(),
                role: "writer".to_owned(),
            }],
            credit_calls: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn terminal_chooser_reprompts_until_valid() {
        let candidates = vec![candidate(1, "Batman", "5"), candidate(2, "Batman", "5")];
        let input = Cursor::new("abc\n7\n\n2\n");
        let mut chooser = TerminalChooser::new(input, Vec::new());
        let choice = chooser.choose("batman 5", &candidates).unwrap();
        assert_eq!(choice, Choice::Pick(2));

        let output = String::from_utf8(chooser.into_output()).unwrap();
        assert!(output.contains("1: Batman -- Issue Number: #5 -- (No issue title available)"));
        assert_eq!(output.matches("Invalid input").count(), 3);
    }

    #[test]
    fn terminal_chooser_zero_skips_and_eof_fails() {
        let candidates = vec![candidate(1, "Batman", "5")];
        let mut chooser = TerminalChooser::new(Cursor::new("0\n"), Vec::new());
        assert_eq!(chooser.choose("q", &candidates).unwrap(), Choice::Skip);

        let mut chooser = TerminalChooser::new(Cursor::new(""), Vec::new());
        let err = chooser.choose("q", &candidates).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn resolver_fetches_credits_for_chosen_candidate() {
        let catalog = fake(vec![candidate(10, "Batman", "5"), candidate(20, "Batman", "5")]);
        let mut chooser = TerminalChooser::new(Cursor::new("2\n"), Vec::new());
        let mut resolver = Resolver::new(&catalog, &mut chooser);

        let Resolution::Selected(chosen) = resolver.resolve(&terms()).unwrap() else {
            panic!("expected a selection");
        };
        assert_eq!(chosen.id, 20);
        assert_eq!(chosen.credits.len(), 1);
        assert_eq!(*catalog.credit_calls.borrow(), vec![20]);
    }

    #[test]
    fn resolver_skip_makes_no_credit_call() {
        let catalog = fake(vec![candidate(10, "Batman", "5")]);
        let mut chooser = TerminalChooser::new(Cursor::new("0\n"), Vec::new());
        let mut resolver = Resolver::new(&catalog, &mut chooser);

        assert_eq!(resolver.resolve(&terms()).unwrap(), Resolution::Skipped);
        assert!(catalog.credit_calls.borrow().is_empty());
    }

    #[test]
    fn resolver_reports_no_results_distinctly() {
        let catalog = fake(Vec::new());
        let mut resolver = Resolver::new(&catalog, FirstMatchChooser);
        let err = resolver.resolve(&terms()).unwrap_err();
        assert!(err.is_not_found(), "{err}");
    }

    #[test]
    fn record_from_candidate_merges_description_credits_and_date() {
        let mut c = candidate(10, "Batman", "5");
        c.name = "The Court of Owls".to_owned();
        c.description = "<h4>Plot</h4><p>Part one.</p><p>Part two.</p>".to_owned();
        c.cover_date = "2012-03-01".to_owned();
        c.credits = vec![
            CreditEntry {
                id: 1,
                name: "A".to_owned(),
                role: "writer".to_owned(),
            },
            CreditEntry {
                id: 2,
                name: "B".to_owned(),
                role: "writer".to_owned(),
            },
            CreditEntry {
                id: 3,
                name: "C".to_owned(),
                role: "inker".to_owned(),
            },
        ];

        let record = record_from_candidate(&c).unwrap();
        assert_eq!(record.title, "The Court of Owls");
        assert_eq!(record.series, "Batman");
        assert_eq!(record.number, "5");
        assert_eq!(record.summary, "Part one.\nPart two.");
        assert_eq!(record.writer, "A,B");
        assert_eq!(record.inker, "C");
        assert_eq!((record.year, record.month, record.day), (Some(2012), Some(3), Some(1)));
    }

    #[test]
    fn record_from_candidate_propagates_malformed_description() {
        let mut c = candidate(10, "Batman", "5");
        c.description = "<p>broken".to_owned();
        assert!(matches!(
            record_from_candidate(&c),
            Err(ResolveError::Description { id: 10, .. })
        ));
    }
}
