use chrono::Local;
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{parse_category, session};
use crate::error::Result;
use crate::filters::parse_pairs;
use crate::presets::{list_filters, save_filter, FilterDraft};

pub struct SaveArgs<'a> {
    pub name: &'a str,
    pub category: &'a str,
    pub params: &'a [String],
    pub description: Option<String>,
    pub public: bool,
    pub favorite: bool,
}

pub fn save(user: Option<&str>, args: SaveArgs) -> Result<()> {
    let s = session(user)?;
    let draft = FilterDraft {
        name: args.name.to_string(),
        description: args.description,
        category: Some(parse_category(args.category)?),
        params: parse_pairs(args.params)?,
        is_public: args.public,
        is_favorite: args.favorite,
    };
    let filter = save_filter(&s.conn, &draft, &s.user, Local::now().date_naive())?;
    println!("Saved filter #{}: {}", filter.id, filter.name);
    Ok(())
}

pub fn list(user: Option<&str>, category: Option<&str>) -> Result<()> {
    let s = session(user)?;
    let category = category.map(parse_category).transpose()?;
    let rows = list_filters(&s.conn, &s.user, category)?;
    if rows.is_empty() {
        println!("No saved filters.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Category", "Parameters", "Public"]);
    for f in rows {
        let name = if f.is_favorite { format!("{} {}", "*".yellow(), f.name) } else { f.name.clone() };
        let pairs: Vec<String> = f.params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        table.add_row(vec![
            Cell::new(f.id),
            Cell::new(name),
            Cell::new(f.category),
            Cell::new(pairs.join(" ")),
            Cell::new(if f.is_public { "yes" } else { "" }),
        ]);
    }
    println!("Saved filters\n{table}");
    Ok(())
}
