use comfy_table::{Cell, Table};

use crate::cli::session;
use crate::error::Result;
use crate::presets::{list_dashboards, save_dashboard, DashboardDraft, Widget};

pub fn add(
    user: Option<&str>,
    name: &str,
    widgets: &[i64],
    description: Option<String>,
    public: bool,
    default: bool,
) -> Result<()> {
    let s = session(user)?;
    let draft = DashboardDraft {
        name: name.to_string(),
        description,
        widgets: widgets.iter().map(|&template_id| Widget { template_id, title: None }).collect(),
        is_public: public,
        is_default: default,
    };
    let dashboard = save_dashboard(&s.conn, &draft, &s.user)?;
    println!(
        "Saved dashboard #{}: {} ({} widgets)",
        dashboard.id,
        dashboard.name,
        dashboard.widgets.len()
    );
    Ok(())
}

pub fn list(user: Option<&str>) -> Result<()> {
    let s = session(user)?;
    let rows = list_dashboards(&s.conn, &s.user)?;
    if rows.is_empty() {
        println!("No dashboards.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Templates", "Public", "Default"]);
    for d in rows {
        let ids: Vec<String> = d.widgets.iter().map(|w| w.template_id.to_string()).collect();
        let is_default = d.is_default && d.owner_id == s.user.id;
        table.add_row(vec![
            Cell::new(d.id),
            Cell::new(&d.name),
            Cell::new(ids.join(", ")),
            Cell::new(if d.is_public { "yes" } else { "" }),
            Cell::new(if is_default { "yes" } else { "" }),
        ]);
    }
    println!("Dashboards\n{table}");
    Ok(())
}
