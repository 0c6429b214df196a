use std::io::Write;

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, instrument};

use crate::cli::Command;
use crate::datetime::{local_date, parse_due_expr};
use crate::error::ValidationError;
use crate::form::{DetailForm, TaskForm};
use crate::gate::{AuthGate, AuthMode};
use crate::identity::IdentityService;
use crate::model::{CoreView, Selection};
use crate::render::Renderer;
use crate::store::DocumentStore;
use crate::workspace::Workspace;

/// Everything a command needs: the auth gate, the workspace behind it and
/// the renderer for output.
pub struct App<I, S> {
    pub gate: AuthGate<I>,
    pub workspace: Workspace<S>,
    pub renderer: Renderer,
    pub timezone: Option<Tz>,
}

impl<I: IdentityService, S: DocumentStore> App<I, S> {
    pub fn new(
        gate: AuthGate<I>,
        workspace: Workspace<S>,
        renderer: Renderer,
        timezone: Option<Tz>,
    ) -> Self {
        let mut app = Self {
            gate,
            workspace,
            renderer,
            timezone,
        };
        app.sync_session();
        app
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        local_date(now, self.timezone)
    }

    /// Feeds pending session changes into the workspace.
    pub fn sync_session(&mut self) {
        let applied = self.gate.sync(&mut self.workspace);
        if applied > 0 {
            debug!(applied, "applied session changes");
        }
    }

    /// Restores a remembered selection. A list that has since gone away
    /// falls back to the first list, else the default view.
    pub fn restore_selection(&mut self, selection: Selection) {
        let Err(err) = self.workspace.select(selection) else {
            return;
        };
        debug!(error = %err, "remembered selection no longer valid");
        let state = self.workspace.state();
        let fallback = match state.lists.first() {
            Some(first) => Selection::List(first.name.clone()),
            None => Selection::View(state.default_view),
        };
        if let Err(err) = self.workspace.select(fallback) {
            debug!(error = %err, "fallback selection rejected");
        }
    }

    fn require_session(&self) -> anyhow::Result<()> {
        if self.gate.is_signed_in() {
            Ok(())
        } else {
            Err(ValidationError::NoSession)
                .context("run `shelf signin <email> <password>` first")
        }
    }

    #[instrument(skip(self, out, now))]
    pub fn execute<W: Write>(
        &mut self,
        command: Option<Command>,
        out: &mut W,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let today = self.today(now);
        let command = command.unwrap_or(Command::Show {
            target: None,
            list: false,
            task: None,
            close: false,
        });

        match command {
            Command::Signup { email, password } => {
                if let Some(notice) = self.gate.submit(AuthMode::SignUp, &email, &password)? {
                    writeln!(out, "{notice}")?;
                }
                Ok(())
            }
            Command::Signin { email, password } => {
                self.gate.submit(AuthMode::SignIn, &email, &password)?;
                self.sync_session();
                let email = self
                    .gate
                    .current_user()
                    .map(|user| user.email.clone())
                    .unwrap_or_default();
                writeln!(out, "Signed in as {email}.")?;
                Ok(())
            }
            Command::Signout => {
                self.gate.sign_out()?;
                self.sync_session();
                writeln!(out, "Signed out.")?;
                Ok(())
            }
            Command::Whoami => {
                match self.gate.current_user() {
                    Some(user) => writeln!(out, "{} ({})", user.email, user.uid)?,
                    None => writeln!(out, "Not signed in.")?,
                }
                Ok(())
            }
            other => {
                self.require_session()?;
                self.execute_signed_in(other, out, today)
            }
        }
    }

    fn execute_signed_in<W: Write>(
        &mut self,
        command: Command,
        out: &mut W,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        match command {
            Command::Lists => {
                let state = self.workspace.state();
                self.renderer.print_lists(out, &state.lists, &state.tasks)
            }
            Command::ListAdd { name } => {
                let list = self.workspace.create_list(&name)?;
                writeln!(out, "Created list {}.", list.name)?;
                Ok(())
            }
            Command::ListRename { name, new_name } => {
                let list = self.workspace.rename_list(&name, &new_name)?;
                writeln!(out, "Renamed list {name} to {}.", list.name)?;
                Ok(())
            }
            Command::ListRm { name } => {
                let removed = self.workspace.delete_list(&name)?;
                writeln!(out, "Deleted list {name} and {removed} task(s).")?;
                Ok(())
            }
            Command::Add {
                title,
                list,
                due,
                description,
                tag,
            } => self.cmd_add(out, today, title, list, due, description, tag),
            Command::Show {
                target,
                list,
                task,
                close,
            } => {
                if let Some(target) = target {
                    let selection = if list {
                        Selection::List(target)
                    } else {
                        Selection::parse(&target)
                    };
                    self.workspace.select(selection)?;
                }
                if let Some(task) = task {
                    self.workspace.toggle_task(&task)?;
                } else if close {
                    self.workspace.close_details();
                }
                let visible = self.workspace.visible(today);
                self.renderer
                    .print_board(out, self.workspace.state(), &visible, today)
            }
            Command::Info { id } => {
                let task = self.workspace.task(&id)?;
                self.renderer.print_task_info(out, task)
            }
            Command::Cycle { id } => {
                let title = self.workspace.task(&id)?.title.clone();
                let status = self.workspace.cycle_status(&id)?;
                writeln!(out, "\"{title}\" is now {status}.")?;
                Ok(())
            }
            Command::Rename { id, title } => {
                self.workspace.rename_task(&id, &title)?;
                writeln!(out, "Renamed task.")?;
                Ok(())
            }
            Command::Edit {
                id,
                title,
                description,
                due,
                no_due,
                list,
            } => {
                let mut form = DetailForm::from_task(self.workspace.task(&id)?);
                if let Some(title) = title {
                    form.title = title;
                }
                if let Some(description) = description {
                    form.description = description;
                }
                if no_due {
                    form.due = None;
                } else if let Some(due) = due {
                    form.due = Some(parse_due_expr(&due, today)?);
                }
                if let Some(list) = list {
                    form.list = list;
                }
                let patch = form.to_patch()?;
                let new_id = self.workspace.update_task(&form.task_id, patch)?;
                writeln!(out, "Updated task {}.", short(&new_id))?;
                Ok(())
            }
            Command::Move { id, list } => {
                let new_id = self.workspace.move_task(&id, &list)?;
                writeln!(out, "Moved task to {list} as {}.", short(&new_id))?;
                Ok(())
            }
            Command::Rm { id } => {
                let task_id = self.workspace.task(&id)?.id.clone();
                self.workspace.delete_task(&task_id)?;
                writeln!(out, "Deleted task {}.", short(&task_id))?;
                Ok(())
            }
            Command::Signup { .. } | Command::Signin { .. } | Command::Signout | Command::Whoami => {
                Err(anyhow!("account commands are handled before the workspace"))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn cmd_add<W: Write>(
        &mut self,
        out: &mut W,
        today: NaiveDate,
        title: String,
        list: Option<String>,
        due: Option<String>,
        description: Option<String>,
        tag: Option<String>,
    ) -> anyhow::Result<()> {
        let state = self.workspace.state();
        let initial = list
            .clone()
            .or_else(|| state.default_target_list().map(str::to_string))
            .unwrap_or_default();

        let mut form = TaskForm::default();
        form.open(&initial, &state.lists);
        if let Some(list) = list {
            // An explicit list must exist; the form would silently repair it.
            self.workspace.list_by_name(&list)?;
            form.list = list;
        }
        form.title = title;
        form.description = description.unwrap_or_default();
        if let Some(due) = due {
            form.due = Some(parse_due_expr(&due, today)?);
        }
        if let Some(tag) = tag {
            form.core_view = tag.parse::<CoreView>()?;
        }

        let draft = form.submit(&self.workspace.state().lists)?;
        let task = self.workspace.add_task(draft)?;
        info!(id = %task.id, list = %task.list, "task added");
        writeln!(out, "Created task {} in {}.", task.short_id(), task.list)?;
        Ok(())
    }
}

fn short(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
