use chrono::Local;
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::catalog::labels_for;
use crate::cli::{parse_category, session};
use crate::error::{DocketError, Result};
use crate::filters::parse_pairs;
use crate::templates::{self, OutputFormat, TemplateDraft};

pub struct AddArgs<'a> {
    pub name: &'a str,
    pub category: &'a str,
    pub fields: Vec<String>,
    pub format: &'a str,
    pub description: Option<String>,
    pub sort: Vec<String>,
    pub defaults: &'a [String],
    pub public: bool,
}

pub fn add(user: Option<&str>, args: AddArgs) -> Result<()> {
    let s = session(user)?;
    let output_format = OutputFormat::parse(args.format.trim())
        .ok_or_else(|| DocketError::UnknownFormat(args.format.to_string()))?;
    let draft = TemplateDraft {
        name: args.name.to_string(),
        description: args.description,
        category: Some(parse_category(args.category)?),
        output_format: Some(output_format),
        fields: args.fields,
        default_filters: parse_pairs(args.defaults)?,
        sort_spec: args.sort,
        group_spec: Vec::new(),
        is_public: args.public,
    };
    let template = templates::create_template(&s.conn, &draft, &s.user, Local::now().date_naive())?;
    println!(
        "Created template #{}: {} ({}, {} fields)",
        template.id,
        template.name,
        template.category,
        template.selected_fields.len()
    );
    Ok(())
}

pub fn list(user: Option<&str>) -> Result<()> {
    let s = session(user)?;
    let rows = templates::list_visible(&s.conn, &s.user)?;
    if rows.is_empty() {
        println!("No templates. Create one with `docket templates add`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Category", "Format", "Fields", "Public", "Owner"]);
    for t in rows {
        let owner = if t.owner_id == s.user.id { "you".to_string() } else { t.owner_id.to_string() };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.name),
            Cell::new(t.category),
            Cell::new(t.output_format),
            Cell::new(t.selected_fields.len()),
            Cell::new(if t.is_public { "yes" } else { "" }),
            Cell::new(owner),
        ]);
    }
    println!("Templates\n{table}");
    Ok(())
}

pub fn show(user: Option<&str>, id: i64) -> Result<()> {
    let s = session(user)?;
    let t = templates::get_template(&s.conn, id)?;
    if !t.visible_to(&s.user) {
        return Err(DocketError::NotFound(format!("template {id}")));
    }
    let (runs, last_run) = templates::usage(&s.conn, id)?;

    println!("{}", t.name.bold());
    if let Some(desc) = &t.description {
        println!("{desc}");
    }
    println!();
    println!("Category:   {}", t.category);
    println!("Format:     {}", t.output_format);
    println!("Public:     {}", if t.is_public { "yes" } else { "no" });
    println!("Active:     {}", if t.is_active { "yes".green() } else { "no".red() });
    println!("Created:    {}", t.created_at.format("%d/%m/%Y %H:%M"));
    println!(
        "Runs:       {runs}{}",
        last_run.map(|d| format!(" (last {})", d.format("%d/%m/%Y %H:%M"))).unwrap_or_default()
    );
    if !t.sort_spec.is_empty() {
        println!("Sort:       {}", t.sort_spec.join(", "));
    }
    if !t.default_filters.is_empty() {
        let pairs: Vec<String> = t.default_filters.iter().map(|(k, v)| format!("{k}={v}")).collect();
        println!("Defaults:   {}", pairs.join(" "));
    }

    let mut table = Table::new();
    table.set_header(vec!["Field", "Label"]);
    for f in &t.selected_fields {
        table.add_row(vec![f.id(), f.label()]);
    }
    println!("\n{table}");
    Ok(())
}

pub fn fields(category: &str) -> Result<()> {
    let category = parse_category(category)?;
    let labels = labels_for(category);
    if labels.is_empty() {
        println!("Category '{category}' has no selectable fields yet.");
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["Field", "Label"]);
    for (id, label) in labels {
        table.add_row(vec![id, label]);
    }
    println!("{category} fields\n{table}");
    Ok(())
}

pub fn delete(user: Option<&str>, id: i64) -> Result<()> {
    let s = session(user)?;
    templates::deactivate(&s.conn, id, &s.user)?;
    println!("Deactivated template #{id}");
    Ok(())
}
