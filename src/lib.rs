use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt::{self, Formatter};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use instant::{Duration, Instant};
use smallvec::{smallvec, SmallVec};

/// The expected maximum number of rows or columns in a searched grid.
pub const MAX_GRID_DIM: usize = 24;

/// A prefix-tree node over a set of words that all share one length.
///
/// Children live in a `BTreeMap` so that `children()` yields them in
/// ascending character order; the solver's merge scan depends on that
/// ordering, so an unordered map is not an option here.
#[derive(Debug, Default)]
pub struct TrieNode {
    children: BTreeMap<char, TrieNode>,
    word_count: usize,
}

impl TrieNode {
    pub fn new() -> TrieNode {
        TrieNode::default()
    }

    /// Insert a word one character at a time, creating missing nodes.
    /// Returns true iff this exact sequence was not already present. A fresh
    /// insertion bumps the word counter on the terminal node and on every
    /// ancestor, so the root's counter is the number of distinct words in
    /// the trie.
    ///
    /// Callers must not pass an empty word; the word list loader guarantees
    /// this for dictionary input.
    pub fn insert(&mut self, word: &str) -> bool {
        debug_assert!(!word.is_empty(), "empty words cannot be inserted");

        let mut chars = word.chars();
        let first = match chars.next() {
            Some(first) => first,
            None => return false,
        };
        let rest = chars.as_str();

        let is_new = if rest.is_empty() {
            match self.children.entry(first) {
                Entry::Vacant(entry) => {
                    entry.insert(TrieNode {
                        children: BTreeMap::new(),
                        word_count: 1,
                    });
                    true
                }
                Entry::Occupied(_) => false,
            }
        } else {
            self.children.entry(first).or_default().insert(rest)
        };

        if is_new {
            self.word_count += 1;
        }
        is_new
    }

    /// Iterate this node's children in ascending character order. Each call
    /// produces an independent iterator, so any number of walks can scan the
    /// same node at once.
    pub fn children(&self) -> impl Iterator<Item = (char, &TrieNode)> + '_ {
        self.children.iter().map(|(&ch, child)| (ch, child))
    }

    /// Number of distinct words terminating at or passing through this node.
    /// Informational only; the search never reads it.
    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// Follow `word` edge by edge from this node, returning the node the
    /// last character lands on.
    pub fn walk(&self, word: &str) -> Option<&TrieNode> {
        let mut node = self;
        for ch in word.chars() {
            node = node.children.get(&ch)?;
        }
        Some(node)
    }

    /// Whether `word` was inserted into this trie. Since every word in a
    /// trie has the same length, membership means walking the word lands on
    /// a leaf.
    pub fn contains(&self, word: &str) -> bool {
        self.walk(word).map_or(false, TrieNode::is_empty)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Errors produced while loading a word list.
#[derive(Debug, thiserror::Error)]
pub enum WordListError {
    /// The word list could not be read.
    #[error("failed to read word list: {0}")]
    Io(#[from] io::Error),
}

/// A word list grouped by word length, the input to `Dictionary::build`.
#[derive(Debug, Default)]
pub struct WordList {
    words_by_length: BTreeMap<usize, Vec<String>>,
}

impl WordList {
    /// Read whitespace-separated words from `reader` and group them by
    /// character count. Duplicates are kept as-is; the trie build dedupes
    /// them. Whitespace splitting means no empty word can get through.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<WordList, WordListError> {
        let mut words_by_length: BTreeMap<usize, Vec<String>> = BTreeMap::new();

        for line in reader.lines() {
            let line = line?;
            for word in line.split_whitespace() {
                words_by_length
                    .entry(word.chars().count())
                    .or_default()
                    .push(word.to_string());
            }
        }

        Ok(WordList { words_by_length })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<WordList, WordListError> {
        WordList::from_reader(BufReader::new(File::open(path)?))
    }

    /// `(length, word count)` pairs in ascending length order, for
    /// reporting. Counts include duplicates.
    pub fn counts_by_length(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.words_by_length
            .iter()
            .map(|(&length, words)| (length, words.len()))
    }
}

/// One trie per distinct word length, built once and read-only afterwards.
pub struct Dictionary {
    tries_by_length: BTreeMap<usize, TrieNode>,
    empty: TrieNode,
    unique_word_count: usize,
}

impl Dictionary {
    /// Build the per-length tries from a word list. Duplicate words are
    /// ignored apart from not counting toward the unique total.
    pub fn build(word_list: &WordList) -> Dictionary {
        let mut tries_by_length: BTreeMap<usize, TrieNode> = BTreeMap::new();
        let mut unique_word_count = 0;

        for (&length, words) in &word_list.words_by_length {
            let trie = tries_by_length.entry(length).or_default();
            for word in words {
                if trie.insert(word) {
                    unique_word_count += 1;
                }
            }
        }

        Dictionary {
            tries_by_length,
            empty: TrieNode::new(),
            unique_word_count,
        }
    }

    /// The trie holding every distinct word of `length`, or an empty trie if
    /// the word list had none. The solver treats an empty trie as an
    /// immediate dead end rather than an error.
    pub fn trie_for_length(&self, length: usize) -> &TrieNode {
        self.tries_by_length.get(&length).unwrap_or(&self.empty)
    }

    /// Total number of distinct words across all lengths.
    pub fn unique_word_count(&self) -> usize {
        self.unique_word_count
    }
}

/// A completed solution grid: `row_count * col_count` characters in
/// row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    row_count: usize,
    col_count: usize,
    cells: Vec<char>,
}

impl Grid {
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn col_count(&self) -> usize {
        self.col_count
    }

    /// The `row_id`th row read left-to-right.
    pub fn row(&self, row_id: usize) -> String {
        self.cells[row_id * self.col_count..(row_id + 1) * self.col_count]
            .iter()
            .collect()
    }

    /// The `col_id`th column read top-to-bottom.
    pub fn column(&self, col_id: usize) -> String {
        (0..self.row_count)
            .map(|row_id| self.cells[row_id * self.col_count + col_id])
            .collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.row_count).map(move |row_id| self.row(row_id))
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for row_id in 0..self.row_count {
            if row_id > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", self.row(row_id))?;
        }
        Ok(())
    }
}

/// Counters and timing for one grid search.
#[derive(Debug, Clone)]
pub struct Statistics {
    /// Cell assignments attempted, including ones later undone.
    pub cells_placed: u64,
    /// Candidate letters abandoned because the branch below them had no
    /// completion.
    pub backtracks: u64,
    /// Completed grids recorded.
    pub solutions: u64,
    pub duration: Duration,
}

/// The outcome of one grid search: every grid found (subject to the stop
/// policy) plus counters describing the search.
#[derive(Debug)]
pub struct SearchReport {
    pub grids: Vec<Grid>,
    pub statistics: Statistics,
}

/// One vector of row trie positions per column, sized so typical searches
/// stay off the heap.
type RowPositions<'dict> = SmallVec<[&'dict TrieNode; MAX_GRID_DIM]>;

/// Column-major backtracking search for grids whose rows are words of length
/// `col_count` and whose columns are words of length `row_count`.
///
/// The solver walks the row trie and the column trie simultaneously: for
/// each cell it intersects the current row-trie node's children with the
/// current column-trie node's children, so only letters that extend both a
/// row word and a column word are ever placed.
pub struct GridSolver<'dict> {
    row_trie: &'dict TrieNode,
    col_trie: &'dict TrieNode,
    row_count: usize,
    col_count: usize,
    cells: Vec<char>,
    grids: Vec<Grid>,
    limit: Option<usize>,
    statistics: Statistics,
}

impl<'dict> GridSolver<'dict> {
    /// Set up a solver for a `row_count` x `col_count` grid. Rows have
    /// `col_count` characters and columns have `row_count` characters, which
    /// is what selects the two tries.
    pub fn new(
        dictionary: &'dict Dictionary,
        row_count: usize,
        col_count: usize,
    ) -> GridSolver<'dict> {
        GridSolver {
            row_trie: dictionary.trie_for_length(col_count),
            col_trie: dictionary.trie_for_length(row_count),
            row_count,
            col_count,
            cells: vec![' '; row_count * col_count],
            grids: vec![],
            limit: None,
            statistics: Statistics {
                cells_placed: 0,
                backtracks: 0,
                solutions: 0,
                duration: Duration::from_millis(0),
            },
        }
    }

    /// Run the search, collecting completed grids until `limit` is reached.
    /// `None` enumerates every solution; `Some(0)` collects nothing.
    ///
    /// A zero-sized shape is defined as vacuously solved: the report
    /// contains exactly one empty grid.
    pub fn solve(mut self, limit: Option<usize>) -> SearchReport {
        let start = Instant::now();
        self.limit = limit;

        if limit == Some(0) {
            // Nothing requested.
        } else if self.row_count == 0 || self.col_count == 0 {
            self.record_solution();
        } else {
            let roots: RowPositions<'dict> = smallvec![self.row_trie; self.row_count];
            self.solve_column(0, &roots);
        }

        self.statistics.duration = start.elapsed();
        SearchReport {
            grids: self.grids,
            statistics: self.statistics,
        }
    }

    /// Fill column `col_id` and everything after it. `prev_positions[row]`
    /// is that row's trie position after the previous column. Returns true
    /// when the search should stop unwinding.
    fn solve_column(&mut self, col_id: usize, prev_positions: &RowPositions<'dict>) -> bool {
        if col_id == self.col_count {
            return self.record_solution();
        }

        // Placeholder entries; each is overwritten before the next column
        // reads it.
        let mut curr_positions: RowPositions<'dict> = smallvec![self.row_trie; self.row_count];
        self.solve_cell(col_id, 0, self.col_trie, prev_positions, &mut curr_positions)
    }

    /// Choose a letter for cell (`row_id`, `col_id`), then recurse one row
    /// down the column, or into the next column once the last row is filled.
    /// Returns true when the search should stop.
    fn solve_cell(
        &mut self,
        col_id: usize,
        row_id: usize,
        col_node: &'dict TrieNode,
        prev_positions: &RowPositions<'dict>,
        curr_positions: &mut RowPositions<'dict>,
    ) -> bool {
        let row_node = prev_positions[row_id];

        // Sorted merge over the two child sequences: both are ascending, so
        // advancing whichever cursor holds the smaller character visits, in
        // ascending order, exactly the letters valid for the row and the
        // column at once. Cost is the sum of the two branching factors, not
        // their product.
        let mut row_children = row_node.children().peekable();
        let mut col_children = col_node.children().peekable();

        while let (Some(&(row_ch, row_child)), Some(&(col_ch, col_child))) =
            (row_children.peek(), col_children.peek())
        {
            if row_ch < col_ch {
                row_children.next();
            } else if col_ch < row_ch {
                col_children.next();
            } else {
                row_children.next();
                col_children.next();

                self.statistics.cells_placed += 1;
                self.cells[row_id * self.col_count + col_id] = row_ch;
                curr_positions[row_id] = row_child;

                let solutions_before = self.statistics.solutions;
                let stop = if row_id + 1 == self.row_count {
                    // Column complete; it becomes the previous column of the
                    // next one.
                    self.solve_column(col_id + 1, curr_positions)
                } else {
                    self.solve_cell(col_id, row_id + 1, col_child, prev_positions, curr_positions)
                };

                if stop {
                    return true;
                }
                // The branch below this letter had no completion; the next
                // candidate (or an ancestor) overwrites the cell.
                if self.statistics.solutions == solutions_before {
                    self.statistics.backtracks += 1;
                }
            }
        }

        false
    }

    fn record_solution(&mut self) -> bool {
        self.statistics.solutions += 1;
        self.grids.push(Grid {
            row_count: self.row_count,
            col_count: self.col_count,
            cells: self.cells.clone(),
        });

        self.limit.map_or(false, |limit| self.grids.len() >= limit)
    }
}

/// Search for grids of the given shape. `limit` caps how many solutions are
/// collected; `None` enumerates all of them.
pub fn solve_grid(
    dictionary: &Dictionary,
    row_count: usize,
    col_count: usize,
    limit: Option<usize>,
) -> SearchReport {
    GridSolver::new(dictionary, row_count, col_count).solve(limit)
}

/// Search for the first grid of the given shape in column-major,
/// ascending-character order.
pub fn find_first(dictionary: &Dictionary, row_count: usize, col_count: usize) -> Option<Grid> {
    solve_grid(dictionary, row_count, col_count, Some(1))
        .grids
        .into_iter()
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dictionary_of(words: &[&str]) -> Dictionary {
        let list =
            WordList::from_reader(words.join("\n").as_bytes()).expect("in-memory word list");
        Dictionary::build(&list)
    }

    #[test]
    fn duplicate_insertions_are_detected() {
        let mut trie = TrieNode::new();

        assert!(trie.insert("cat"));
        assert!(!trie.insert("cat"));
        assert!(trie.insert("car"));

        assert_eq!(trie.word_count(), 2);
        assert_eq!(trie.walk("ca").expect("shared prefix").word_count(), 2);
        assert_eq!(trie.walk("cat").expect("terminal node").word_count(), 1);
    }

    #[test]
    fn children_iterate_in_ascending_order() {
        let mut trie = TrieNode::new();
        for word in ["cot", "apt", "bat"] {
            trie.insert(word);
        }

        let first: Vec<char> = trie.children().map(|(ch, _)| ch).collect();
        let second: Vec<char> = trie.children().map(|(ch, _)| ch).collect();

        assert_eq!(first, vec!['a', 'b', 'c']);
        assert_eq!(first, second);
    }

    #[test]
    fn membership_round_trips_by_walk() {
        let mut trie = TrieNode::new();
        for word in ["bass", "bats", "bess"] {
            assert!(trie.insert(word));
        }

        for word in ["bass", "bats", "bess"] {
            let node = trie.walk(word).expect("inserted word must be reachable");
            assert!(node.is_empty(), "equal-length words terminate at leaves");
        }

        assert!(trie.walk("base").is_none());
        assert!(trie.contains("bass"));
        assert!(!trie.contains("bas"));
    }

    #[test]
    fn dictionary_routes_words_by_length() {
        let dictionary = dictionary_of(&["a", "to", "tea", "ten", "tea"]);

        assert_eq!(dictionary.trie_for_length(1).word_count(), 1);
        assert_eq!(dictionary.trie_for_length(2).word_count(), 1);
        assert_eq!(dictionary.trie_for_length(3).word_count(), 2);
        assert!(dictionary.trie_for_length(7).is_empty());
        assert_eq!(dictionary.unique_word_count(), 4);
    }

    #[test]
    fn loader_groups_words_by_length() {
        let list = WordList::from_reader("cat dog\nbird\n  to\n".as_bytes()).expect("readable");

        let counts: Vec<(usize, usize)> = list.counts_by_length().collect();
        assert_eq!(counts, vec![(2, 1), (3, 2), (4, 1)]);
    }

    #[test]
    fn missing_length_terminates_immediately() {
        let dictionary = dictionary_of(&["cat", "cot"]);

        // Rows would need length-4 words.
        let report = solve_grid(&dictionary, 3, 4, None);
        assert!(report.grids.is_empty());
        assert_eq!(report.statistics.cells_placed, 0);

        // Columns would need length-4 words.
        let report = solve_grid(&dictionary, 4, 3, None);
        assert!(report.grids.is_empty());
    }

    #[test]
    fn no_grid_exists_when_every_word_shares_a_first_letter() {
        // Column 0 would have to read "ccc", which is not a word.
        let dictionary = dictionary_of(&["cat", "car", "cop", "cap", "cot"]);

        let report = solve_grid(&dictionary, 3, 3, None);

        assert!(report.grids.is_empty());
        assert_eq!(report.statistics.solutions, 0);
        assert!(report.statistics.backtracks > 0);
    }

    #[test]
    fn single_row_grid_spells_the_word() {
        let mut words: Vec<String> = ('a'..='z').map(|ch| ch.to_string()).collect();
        words.push("words".to_string());
        let refs: Vec<&str> = words.iter().map(String::as_str).collect();
        let dictionary = dictionary_of(&refs);

        let report = solve_grid(&dictionary, 1, 5, None);

        assert_eq!(report.grids.len(), 1);
        assert_eq!(report.grids[0].row(0), "words");
    }

    #[test]
    fn symmetric_square_has_exactly_one_solution() {
        // Only "cat" can open column 0: rows starting with 'r', 'e', or 'n'
        // would be needed for "are" or "ten" down the first column, and none
        // exist. The rows are forced to cat/are/ten, whose columns happen to
        // read the same.
        let dictionary = dictionary_of(&["cat", "are", "ten"]);

        let report = solve_grid(&dictionary, 3, 3, None);

        assert_eq!(report.grids.len(), 1);
        assert_eq!(report.grids[0].to_string(), "cat\nare\nten");
    }

    #[test]
    fn rows_and_columns_read_as_words() {
        let dictionary = dictionary_of(&["tab", "ore", "to", "ar", "be"]);

        let report = solve_grid(&dictionary, 2, 3, None);
        assert_eq!(report.grids.len(), 1);

        let grid = &report.grids[0];
        let row_trie = dictionary.trie_for_length(3);
        let col_trie = dictionary.trie_for_length(2);
        for row_id in 0..grid.row_count() {
            assert!(row_trie.contains(&grid.row(row_id)));
        }
        for col_id in 0..grid.col_count() {
            assert!(col_trie.contains(&grid.column(col_id)));
        }
        assert_eq!(grid.row(0), "tab");
        assert_eq!(grid.row(1), "ore");
    }

    #[test]
    fn enumerate_all_matches_brute_force() {
        let words = ["aa", "ab", "ba"];
        let dictionary = dictionary_of(&words);

        let report = solve_grid(&dictionary, 2, 2, None);
        let mut found: Vec<(String, String)> = report
            .grids
            .iter()
            .map(|grid| (grid.row(0), grid.row(1)))
            .collect();
        found.sort();

        let mut expected = vec![];
        for top in &words {
            for bottom in &words {
                let columns_ok = (0..2).all(|col| {
                    let column: String = [
                        top.as_bytes()[col] as char,
                        bottom.as_bytes()[col] as char,
                    ]
                    .iter()
                    .collect();
                    words.contains(&column.as_str())
                });
                if columns_ok {
                    expected.push((top.to_string(), bottom.to_string()));
                }
            }
        }
        expected.sort();

        assert_eq!(found, expected);
        assert_eq!(found.len(), 7);
    }

    #[test]
    fn limit_stops_the_search_early() {
        let dictionary = dictionary_of(&["aa", "ab", "ba"]);

        let capped = solve_grid(&dictionary, 2, 2, Some(2));
        assert_eq!(capped.grids.len(), 2);
        assert_eq!(capped.statistics.solutions, 2);

        // Column-major ascending order makes the all-'a' grid the first hit.
        let first = find_first(&dictionary, 2, 2).expect("a 2x2 grid exists");
        assert_eq!(first.row(0), "aa");
        assert_eq!(first.row(1), "aa");
    }

    #[test]
    fn zero_dimension_is_vacuously_solved() {
        let dictionary = dictionary_of(&["cat"]);

        for (rows, cols) in [(0, 3), (3, 0), (0, 0)] {
            let report = solve_grid(&dictionary, rows, cols, None);
            assert_eq!(report.grids.len(), 1);
            assert!(report.grids[0].rows().all(|row| row.is_empty()));
        }
    }
}
