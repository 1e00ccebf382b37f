use crate::cli::db_path;
use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::file_size;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let path = db_path(&settings);

    println!("User:       {}", if settings.user_name.is_empty() { "(not set)" } else { &settings.user_name });
    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", path.display());

    if !path.exists() {
        println!();
        println!("Database not found. Run `docket init` to set up.");
        return Ok(());
    }

    let size = std::fs::metadata(&path)?.len();
    println!("DB size:    {}", file_size(Some(size)));

    let conn = get_connection(&path)?;
    let count = |table: &str| -> Result<i64> {
        Ok(conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))?)
    };
    let failed: i64 = conn.query_row(
        "SELECT count(*) FROM report_executions WHERE status = 'failed'",
        [],
        |r| r.get(0),
    )?;

    println!();
    println!("Users:        {}", count("users")?);
    println!("Clients:      {}", count("clients")?);
    println!("Cases:        {}", count("cases")?);
    println!("Fees:         {}", count("fees")?);
    println!("Expenses:     {}", count("expenses")?);
    println!("Templates:    {}", count("report_templates")?);
    println!("Executions:   {} ({failed} failed)", count("report_executions")?);
    Ok(())
}
