use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::db::insert_user;
use crate::error::Result;
use crate::settings::{load_settings, save_settings};
use crate::store::list_users;

pub fn add(username: &str, name: Option<&str>, staff: bool, default: bool) -> Result<()> {
    let mut settings = load_settings();
    let conn = open_db(&settings)?;
    insert_user(&conn, username.trim(), name.unwrap_or_default(), staff)?;
    println!("Added user: {username}{}", if staff { " (staff)" } else { "" });

    if default || settings.user_name.is_empty() {
        settings.user_name = username.trim().to_string();
        save_settings(&settings)?;
        println!("Acting user is now {username}");
    }
    Ok(())
}

pub fn list() -> Result<()> {
    let settings = load_settings();
    let conn = open_db(&settings)?;
    let users = list_users(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Username", "Name", "Staff", ""]);
    for u in users {
        let current = if u.username == settings.user_name { "*" } else { "" };
        table.add_row(vec![
            Cell::new(u.id),
            Cell::new(&u.username),
            Cell::new(&u.full_name),
            Cell::new(if u.is_staff { "yes" } else { "" }),
            Cell::new(current),
        ]);
    }
    println!("Users\n{table}");
    Ok(())
}
