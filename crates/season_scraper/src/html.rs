use scraper::{ElementRef, Html};

use crate::table::{CandidateTable, Cell};

const MAX_COLSPAN: usize = 64;

/// Removes HTML comment delimiters so that tables hidden inside comments become real markup.
pub fn strip_comment_delimiters(html: &str) -> String {
	html.replace("<!--", "").replace("-->", "")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
	Head,
	Body,
}

struct RawRow {
	section: Section,
	all_header_cells: bool,
	cells: Vec<String>,
}

/// Extracts every `<table>` of the document, in document order.
///
/// Header labels come from the last `<thead>` row when there is one, else from a leading
/// row made only of `<th>` cells, else they are positional (`"0"`, `"1"`, ...).
pub fn extract_tables(html: &str) -> Vec<CandidateTable> {
	let document = Html::parse_document(html);
	document
		.root_element()
		.descendants()
		.filter_map(ElementRef::wrap)
		.filter(|el| el.value().name() == "table")
		.map(table_from_element)
		.collect()
}

fn table_from_element(table: ElementRef<'_>) -> CandidateTable {
	let mut rows = collect_rows(table);

	let header_at = rows
		.iter()
		.rposition(|r| r.section == Section::Head)
		.or_else(|| rows.first().filter(|r| r.all_header_cells).map(|_| 0));

	let columns = match header_at {
		Some(index) => {
			let header = rows.remove(index);
			rows.retain(|r| r.section == Section::Body);
			header.cells
		}
		None => {
			let width = rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);
			(0..width).map(|i| i.to_string()).collect()
		}
	};

	let width = columns.len();
	let rows = rows
		.into_iter()
		.map(|r| {
			let mut cells: Vec<Cell> = r.cells.iter().map(|c| Cell::from_text(c)).collect();
			cells.resize(width, Cell::Missing);
			cells
		})
		.collect();

	CandidateTable {
		id: table.value().attr("id").map(str::to_string),
		columns,
		rows,
	}
}

/// Rows that belong to `table` itself; rows of nested tables are skipped.
fn collect_rows(table: ElementRef<'_>) -> Vec<RawRow> {
	let mut rows = Vec::new();
	for child in table.children().filter_map(ElementRef::wrap) {
		match child.value().name() {
			"tr" => push_row(&mut rows, child, Section::Body),
			"thead" => child.children().filter_map(ElementRef::wrap).filter(|el| el.value().name() == "tr").for_each(|tr| push_row(&mut rows, tr, Section::Head)),
			"tbody" | "tfoot" => child.children().filter_map(ElementRef::wrap).filter(|el| el.value().name() == "tr").for_each(|tr| push_row(&mut rows, tr, Section::Body)),
			_ => {}
		}
	}
	rows
}

fn push_row(rows: &mut Vec<RawRow>, tr: ElementRef<'_>, section: Section) {
	let mut cells = Vec::new();
	let mut all_header_cells = true;
	for cell in tr.children().filter_map(ElementRef::wrap) {
		let name = cell.value().name();
		if name != "td" && name != "th" {
			continue;
		}
		all_header_cells &= name == "th";
		let text = normalize_ws(&cell.text().collect::<String>());
		let span = cell.value().attr("colspan").and_then(|s| s.trim().parse::<usize>().ok()).unwrap_or(1).clamp(1, MAX_COLSPAN);
		cells.extend(std::iter::repeat(text).take(span));
	}
	if !cells.is_empty() {
		rows.push(RawRow { section, all_header_cells, cells });
	}
}

fn normalize_ws(s: &str) -> String {
	s.split_whitespace().collect::<Vec<_>>().join(" ")
}
