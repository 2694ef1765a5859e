use anyhow::{anyhow, bail, Context, Result};
use crossterm::style::Stylize;
use std::path::PathBuf;

mod table_display;

use datagrid::config::config::Config;
use datagrid::data::data_view::SortDirection;
use datagrid::data::loaders::load_file;
use datagrid::state::persistence::{JsonViewRepository, ViewRepository};
use datagrid::state::{InitConfig, StoreRegistry};
use datagrid::ui::app::GridApp;
use datagrid::ui::grid::{DataGrid, GridOptions};
use datagrid::ui::header::FirstColumnMenu;
use datagrid::utils::app_paths::AppPaths;
use datagrid::utils::logging::init_tracing;
use table_display::print_grid;

fn print_help() {
    println!("{}", "datagrid - virtualized data grid with saved views".blue().bold());
    println!();
    println!("{}", "Usage:".yellow());
    println!("  datagrid [OPTIONS] FILE.csv|FILE.json");
    println!();
    println!("{}", "Options:".yellow());
    println!("  {}      - Open the saved view called NAME", "--view NAME".green());
    println!("  {}     - Read and write saved views in FILE", "--views FILE".green());
    println!("  {}     - Start with a text query", "--query TEXT".green());
    println!("  {} - Start sorted by COL", "--sort COL[:desc]".green());
    println!("  {}           - Print the grid as a table and exit", "--print".green());
    println!("  {} - Write a commented config file", "--generate-config".green());
    println!("  {}            - Show this help", "--help".green());
    println!();
    println!("{}", "Keys:".yellow());
    println!("  {}  - Move row / column", "arrows".green());
    println!("  {}     - Sort, pin, compare column", "s p c".green());
    println!("  {}       - Text query", "/".green());
    println!("  {}     - Save, new, edit view", "v n e".green());
    println!("  {}     - Next view", "Tab".green());
    println!("  {}       - Quit", "q".green());
}

#[derive(Debug, Default)]
struct Args {
    file: Option<PathBuf>,
    view: Option<String>,
    views_file: Option<PathBuf>,
    query: Option<String>,
    sort: Option<(String, SortDirection)>,
    print: bool,
    help: bool,
    generate_config: bool,
}

fn parse_sort(arg: &str) -> (String, SortDirection) {
    match arg.rsplit_once(':') {
        Some((key, dir)) if dir.eq_ignore_ascii_case("desc") => (key.to_string(), SortDirection::Desc),
        Some((key, dir)) if dir.eq_ignore_ascii_case("asc") => (key.to_string(), SortDirection::Asc),
        _ => (arg.to_string(), SortDirection::Asc),
    }
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut parsed = Args::default();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{} needs a value", flag))
        };
        match arg.as_str() {
            "--view" => parsed.view = Some(value(arg.as_str())?),
            "--views" => parsed.views_file = Some(PathBuf::from(value(arg.as_str())?)),
            "--query" => parsed.query = Some(value(arg.as_str())?),
            "--sort" => parsed.sort = Some(parse_sort(&value(arg.as_str())?)),
            "--print" => parsed.print = true,
            "--help" | "-h" => parsed.help = true,
            "--generate-config" => parsed.generate_config = true,
            other if other.starts_with("--") => bail!("Unknown option {}", other),
            file => parsed.file = Some(PathBuf::from(file)),
        }
    }
    Ok(parsed)
}

fn generate_config() -> Result<()> {
    let path = Config::get_config_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Error creating config directory {}", parent.display()))?;
    }
    std::fs::write(&path, Config::create_default_with_comments())
        .with_context(|| format!("Error writing config file {}", path.display()))?;
    println!("Configuration file created at: {:?}", path);
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: using default config ({:#})", e);
            Config::default()
        }
    };
    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("Warning: logging disabled ({:#})", e);
    }

    let Some(file) = args.file else {
        print_help();
        bail!("No data file given");
    };
    let table = load_file(&file)?;

    let views_path = match args.views_file {
        Some(path) => path,
        None => AppPaths::views_file()?,
    };
    let repository = JsonViewRepository::new(views_path);
    let views = repository.load_views(&table.name)?;

    let current_view_id = match &args.view {
        Some(name) => {
            let Some(view) = views.iter().find(|v| v.name == *name) else {
                bail!("No saved view named '{}' for {}", name, table.name);
            };
            Some(view.id.clone())
        }
        None => None,
    };

    let mut registry = StoreRegistry::new();
    registry.init_store(
        &table.name,
        InitConfig {
            views,
            current_view_id,
            column_keys: table.columns.iter().map(|c| c.key.clone()).collect(),
            ..Default::default()
        },
    );
    let store = registry.store(&table.name);

    let options = GridOptions {
        selectable: true,
        first_column_menu: FirstColumnMenu {
            inline_query: true,
            manage_columns: true,
        },
    };
    let mut grid = DataGrid::new(store, table.rows, table.columns, &config, options)?;
    if let Some((key, direction)) = &args.sort {
        if grid.column(key).is_none() {
            bail!("Unknown sort column '{}'", key);
        }
        grid.sort_by(Some(key.as_str()), Some(*direction))?;
    }
    if let Some(query) = &args.query {
        grid.set_text_query(query)?;
    }

    if args.print {
        print_grid(&grid);
        return Ok(());
    }

    GridApp::new(grid, Box::new(repository), &config, table.name).run()
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", format!("Error: {:#}", e).red());
            print_help();
            std::process::exit(2);
        }
    };

    if args.help {
        print_help();
        return;
    }
    if args.generate_config {
        if let Err(e) = generate_config() {
            eprintln!("{}", format!("Error: {:#}", e).red());
            std::process::exit(1);
        }
        return;
    }

    if let Err(e) = run(args) {
        eprintln!("{}", format!("Error: {:#}", e).red());
        std::process::exit(1);
    }
}
