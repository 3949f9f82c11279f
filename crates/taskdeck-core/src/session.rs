use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, anyhow};
use chrono::{NaiveDate, Utc};
use tracing::{debug, warn};

use crate::config::Config;
use crate::datetime;
use crate::form::{FormController, SubmitOutcome};
use crate::render::Renderer;
use crate::store::TaskStore;
use crate::validate::Field;
use crate::view::{self, DueFilter, PriorityFilter, SortKey, SortOrder, ViewOptions};

/// What the loop should do after a dispatched line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Quit,
}

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "set", "blur", "form", "submit", "cancel", "edit", "delete", "list", "export", "filter",
        "sort", "help", "version", "quit", "exit",
    ]
}

/// Expand an unambiguous command prefix, e.g. `su` → `submit`. Exact
/// names always win; an ambiguous prefix expands to nothing.
pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

/// One interactive session: the store, the form, and the list-view
/// controls, driven by one event per input line. Events run to
/// completion before the next line is read; there is nothing async
/// anywhere in here.
#[derive(Debug)]
pub struct Session {
    store: TaskStore,
    form: FormController,
    options: ViewOptions,
}

impl Session {
    pub fn new(cfg: &Config) -> Self {
        Self {
            store: TaskStore::new(),
            form: FormController::new(),
            options: initial_view_options(cfg),
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    /// Read lines from stdin until EOF or `quit`. Per-line failures are
    /// reported and the loop keeps going; only broken input is fatal.
    pub fn run(&mut self, renderer: &mut Renderer) -> anyhow::Result<()> {
        let stdin = io::stdin();
        let interactive = stdin.is_terminal();
        let mut lines = stdin.lock().lines();

        loop {
            if interactive {
                print!("deck> ");
                io::stdout().flush().context("failed to flush prompt")?;
            }

            let Some(line) = lines.next() else {
                break;
            };
            let line = line.context("failed to read input line")?;

            match self.dispatch(renderer, line.trim()) {
                Ok(Step::Quit) => break,
                Ok(Step::Continue) => {}
                Err(err) => eprintln!("error: {err:#}"),
            }
        }

        Ok(())
    }

    /// Dispatch a single session event. Errors leave every piece of
    /// state exactly as it was.
    #[tracing::instrument(skip(self, renderer, line))]
    pub fn dispatch(&mut self, renderer: &mut Renderer, line: &str) -> anyhow::Result<Step> {
        if line.is_empty() {
            return Ok(Step::Continue);
        }

        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Ok(Step::Continue);
        };
        let args: Vec<&str> = parts.collect();

        let known = known_command_names();
        let command = expand_command_abbrev(head, &known)
            .ok_or_else(|| anyhow!("unknown command: {head}"))?;

        let now = Utc::now();
        let today = datetime::today(now);
        debug!(command, args = ?args, "dispatching session event");

        match command {
            "set" => self.cmd_set(&args),
            "blur" => self.cmd_blur(&args),
            "form" => self.cmd_form(renderer, today),
            "submit" => self.cmd_submit(renderer, now),
            "cancel" => self.cmd_cancel(),
            "edit" => self.cmd_edit(&args),
            "delete" => self.cmd_delete(&args),
            "list" => self.cmd_list(renderer, today),
            "export" => self.cmd_export(today),
            "filter" => self.cmd_filter(&args),
            "sort" => self.cmd_sort(&args),
            "help" => cmd_help(),
            "version" => {
                println!("{}", env!("CARGO_PKG_VERSION"));
                Ok(Step::Continue)
            }
            "quit" | "exit" => Ok(Step::Quit),
            other => Err(anyhow!("unknown command: {other}")),
        }
    }

    fn cmd_set(&mut self, args: &[&str]) -> anyhow::Result<Step> {
        let field = parse_field_arg(args)?;
        let value = args[1..].join(" ");
        self.form.set_field(field, &value);
        Ok(Step::Continue)
    }

    fn cmd_blur(&mut self, args: &[&str]) -> anyhow::Result<Step> {
        let field = parse_field_arg(args)?;
        self.form.blur(field);
        Ok(Step::Continue)
    }

    fn cmd_form(&mut self, renderer: &mut Renderer, today: NaiveDate) -> anyhow::Result<Step> {
        renderer.print_form(
            self.form.mode(&self.store),
            self.form.fields(),
            &self.form.visible_errors(today),
            self.form.is_valid(today),
        )?;
        Ok(Step::Continue)
    }

    fn cmd_submit(
        &mut self,
        renderer: &mut Renderer,
        now: chrono::DateTime<Utc>,
    ) -> anyhow::Result<Step> {
        match self.form.submit(&mut self.store, now) {
            SubmitOutcome::Created(id) => println!("Created task {id}."),
            SubmitOutcome::Updated(id) => println!("Saved task {id}."),
            SubmitOutcome::Rejected(errors) => {
                println!("Submit rejected:");
                renderer.print_errors(&errors)?;
            }
        }
        Ok(Step::Continue)
    }

    fn cmd_cancel(&mut self) -> anyhow::Result<Step> {
        self.form.cancel(&mut self.store);
        println!("Edit cancelled.");
        Ok(Step::Continue)
    }

    fn cmd_edit(&mut self, args: &[&str]) -> anyhow::Result<Step> {
        let id = parse_id_arg(args)?;
        if self.form.enter_edit(&mut self.store, id) {
            println!("Editing task {id}.");
            Ok(Step::Continue)
        } else {
            Err(anyhow!("no such task: {id}"))
        }
    }

    fn cmd_delete(&mut self, args: &[&str]) -> anyhow::Result<Step> {
        let id = parse_id_arg(args)?;
        let removed = self.store.delete(id);
        println!("Deleted {removed} task(s).");
        Ok(Step::Continue)
    }

    fn cmd_list(&mut self, renderer: &mut Renderer, today: NaiveDate) -> anyhow::Result<Step> {
        let visible = view::derive(self.store.tasks(), &self.options, today);
        renderer.print_task_table(&visible, today)?;
        Ok(Step::Continue)
    }

    fn cmd_export(&mut self, today: NaiveDate) -> anyhow::Result<Step> {
        for task in view::derive(self.store.tasks(), &self.options, today) {
            let serialized =
                serde_json::to_string(task).context("failed to serialize task")?;
            println!("{serialized}");
        }
        Ok(Step::Continue)
    }

    fn cmd_filter(&mut self, args: &[&str]) -> anyhow::Result<Step> {
        let (kind, value) = match args {
            [kind, value] => (*kind, *value),
            _ => return Err(anyhow!("usage: filter <priority|due> <value>")),
        };

        match kind {
            "priority" => {
                self.options.priority = PriorityFilter::parse(value)
                    .ok_or_else(|| anyhow!("priority filter must be all, low, medium, or high"))?;
                println!("Filter priority = {}.", self.options.priority.label());
            }
            "due" => {
                self.options.due = DueFilter::parse(value)
                    .ok_or_else(|| anyhow!("due filter must be all, overdue, or week"))?;
                println!("Filter due = {}.", self.options.due.label());
            }
            other => return Err(anyhow!("unknown filter: {other}")),
        }
        Ok(Step::Continue)
    }

    fn cmd_sort(&mut self, args: &[&str]) -> anyhow::Result<Step> {
        let Some(key_raw) = args.first() else {
            return Err(anyhow!("usage: sort <none|priority|due> [asc|desc]"));
        };

        let key = SortKey::parse(key_raw)
            .ok_or_else(|| anyhow!("sort key must be none, priority, or due"))?;
        let order = match args.get(1) {
            Some(raw) => SortOrder::parse(raw)
                .ok_or_else(|| anyhow!("sort order must be asc or desc"))?,
            None => self.options.order,
        };

        self.options.sort = key;
        self.options.order = order;
        println!(
            "Sort = {} ({}).",
            self.options.sort.label(),
            self.options.order.label()
        );
        Ok(Step::Continue)
    }
}

fn parse_field_arg(args: &[&str]) -> anyhow::Result<Field> {
    let raw = args
        .first()
        .ok_or_else(|| anyhow!("expected a field name"))?;
    Field::parse(raw)
        .ok_or_else(|| anyhow!("unknown field: {raw} (name, due, priority, description, completed)"))
}

fn parse_id_arg(args: &[&str]) -> anyhow::Result<i64> {
    let raw = args.first().ok_or_else(|| anyhow!("expected a task id"))?;
    raw.parse::<i64>()
        .with_context(|| format!("invalid task id: {raw}"))
}

fn cmd_help() -> anyhow::Result<Step> {
    println!("set <field> <value>       change a form field");
    println!("blur <field>              mark a field touched");
    println!("form                      show form state and visible errors");
    println!("submit                    create or save the task");
    println!("cancel                    leave edit mode, keep the store");
    println!("edit <id>                 load a task into the form");
    println!("delete <id>               remove a task");
    println!("list                      show the filtered, sorted view");
    println!("export                    print the view as JSON lines");
    println!("filter priority <level>   all, low, medium, high");
    println!("filter due <bucket>       all, overdue, week");
    println!("sort <key> [order]        none, priority, due; asc, desc");
    println!("help | version | quit");
    Ok(Step::Continue)
}

fn initial_view_options(cfg: &Config) -> ViewOptions {
    let mut options = ViewOptions::default();

    if let Some(raw) = cfg.get("view.priority") {
        match PriorityFilter::parse(&raw) {
            Some(parsed) => options.priority = parsed,
            None => warn!(value = %raw, "ignoring invalid view.priority"),
        }
    }
    if let Some(raw) = cfg.get("view.due") {
        match DueFilter::parse(&raw) {
            Some(parsed) => options.due = parsed,
            None => warn!(value = %raw, "ignoring invalid view.due"),
        }
    }
    if let Some(raw) = cfg.get("view.sort") {
        match SortKey::parse(&raw) {
            Some(parsed) => options.sort = parsed,
            None => warn!(value = %raw, "ignoring invalid view.sort"),
        }
    }
    if let Some(raw) = cfg.get("view.order") {
        match SortOrder::parse(&raw) {
            Some(parsed) => options.order = parsed,
            None => warn!(value = %raw, "ignoring invalid view.order"),
        }
    }

    options
}
