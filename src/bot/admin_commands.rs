//! `/admin_*` command handling.

use crate::error::CommandError;

use super::dispatcher::{CommandArgs, Dispatcher, roadmap_reply};
use super::reply::Reply;

const DEFAULT_LOG_LIMIT: usize = 20;

fn json_text(value: &impl serde::Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn unknown_action(command: &str, action: &str, known: &str) -> CommandError {
    CommandError::Usage(format!("Unknown /{command} action '{action}' ({known})"))
}

impl Dispatcher {
    pub(crate) async fn admin_command(
        &self,
        actor: &str,
        roles: &[String],
        command: &str,
        args: &CommandArgs,
    ) -> Result<Reply, CommandError> {
        self.admin.authorize(actor, roles)?;
        tracing::info!(actor, command, subcommand = ?args.subcommand, "Admin command");

        match command {
            "admin_state" => self.admin_state(actor, args).await,
            "admin_actions" => self.admin_actions(actor, args).await,
            "admin_memory" => self.admin_memory(actor, args).await,
            "admin_config" => self.admin_config(actor, args).await,
            "admin_reports" => self.admin_reports(args).await,
            "admin_logs" => {
                let limit = args
                    .opt("limit")
                    .and_then(|l| l.parse().ok())
                    .unwrap_or(DEFAULT_LOG_LIMIT);
                let records = self.admin.log().recent(limit).await?;
                if records.is_empty() {
                    return Ok(Reply::text("No admin actions logged."));
                }
                let body = records
                    .iter()
                    .map(|r| {
                        format!(
                            "{} {} {} {}",
                            r.timestamp.format("%Y-%m-%d %H:%M:%S"),
                            r.actor_id,
                            r.action,
                            r.target_user_id.as_deref().unwrap_or("-")
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(Reply::titled("Admin log", body))
            }
            "admin_sandbox" => {
                let user = args.require("user")?;
                let message = args.text.trim();
                if message.is_empty() {
                    return Err(CommandError::Usage(
                        "Usage: /admin_sandbox user=<id> <message>".into(),
                    ));
                }
                let preview = self.admin.sandbox(user, message).await?;
                let mut reply = Reply::titled(format!("Sandbox for {user}"), preview.result);
                if let Some(flow) = preview.active_flow {
                    reply = reply.field("Active flow", flow.to_string());
                }
                Ok(reply)
            }
            other => Ok(Reply::error(format!("Unknown admin command /{other}."))),
        }
    }

    async fn admin_state(&self, actor: &str, args: &CommandArgs) -> Result<Reply, CommandError> {
        let user = args.require("user")?;
        match args.sub().unwrap_or_default() {
            "reset" => {
                let deleted = self.admin.reset_user(actor, user).await?;
                Ok(Reply::text(format!("Reset {user}: {deleted} keys deleted.")))
            }
            "profile_set" => {
                let field = args.require("field")?;
                let value = args.opt_or_text("value").unwrap_or_default();
                let profile = self.admin.profile_set(actor, user, field, value).await?;
                Ok(Reply::titled(format!("Profile of {user}"), json_text(&profile)))
            }
            "pushmode" => {
                let state = self.admin.toggle_pushmode(actor, user).await?;
                Ok(Reply::titled(format!("Push mode for {user}"), "Toggled.")
                    .field("Enabled", if state.enabled { "yes" } else { "no" })
                    .field("Level", state.level.to_string()))
            }
            "set_stage" => {
                let stage = args.opt_or_text("stage").ok_or_else(|| {
                    CommandError::Usage("Missing stage=...".into())
                })?;
                let roadmap = self.admin.set_stage(actor, user, stage).await?;
                Ok(roadmap_reply(&roadmap))
            }
            other => Err(unknown_action(
                "admin_state",
                other,
                "reset, profile_set, pushmode, set_stage",
            )),
        }
    }

    async fn admin_actions(&self, actor: &str, args: &CommandArgs) -> Result<Reply, CommandError> {
        let user = args.require("user")?;
        match args.sub().unwrap_or_default() {
            "reset_user" => {
                let deleted = self.admin.reset_user(actor, user).await?;
                Ok(Reply::text(format!("Reset {user}: {deleted} keys deleted.")))
            }
            "run_marketing" => {
                let assets = self.admin.run_marketing(actor, user, args.opt("type")).await?;
                Ok(Reply::titled(format!("Marketing for {user}"), assets))
            }
            other => Err(unknown_action("admin_actions", other, "reset_user, run_marketing")),
        }
    }

    async fn admin_memory(&self, actor: &str, args: &CommandArgs) -> Result<Reply, CommandError> {
        let user = args.require("user")?;
        let key = args.require("key")?;
        match args.sub().unwrap_or("get") {
            "get" => Ok(match self.admin.memory_get(user, key).await? {
                Some(value) => Reply::titled(format!("user:{user}:{key}"), value),
                None => Reply::text(format!("user:{user}:{key} is not set.")),
            }),
            "set" => {
                let value = args.opt_or_text("value").ok_or_else(|| {
                    CommandError::Usage("Missing value=...".into())
                })?;
                let stored = self.admin.memory_set(actor, user, key, value).await?;
                Ok(Reply::titled(format!("user:{user}:{key}"), stored.to_string()))
            }
            "delete" => {
                let removed = self.admin.memory_delete(actor, user, key).await?;
                Ok(Reply::text(if removed {
                    format!("Deleted user:{user}:{key}.")
                } else {
                    format!("user:{user}:{key} was not set.")
                }))
            }
            other => Err(unknown_action("admin_memory", other, "get, set, delete")),
        }
    }

    async fn admin_config(&self, actor: &str, args: &CommandArgs) -> Result<Reply, CommandError> {
        let key = args.require("key")?;
        match args.sub().unwrap_or("get") {
            "get" => {
                let value = self.admin.config_get(key).await?;
                Ok(Reply::titled(
                    format!("config:{key}"),
                    value.map(|v| v.to_string()).unwrap_or_else(|| "(default)".into()),
                ))
            }
            "set" => {
                let value = args.opt_or_text("value").unwrap_or_default();
                let stored = self.admin.config_set(actor, key, value).await?;
                Ok(Reply::titled(format!("config:{key}"), stored.to_string()))
            }
            other => Err(unknown_action("admin_config", other, "get, set")),
        }
    }

    async fn admin_reports(&self, args: &CommandArgs) -> Result<Reply, CommandError> {
        match args.sub().unwrap_or("engagement") {
            "engagement" => {
                let report = self.admin.engagement_report().await?;
                Ok(Reply::titled("Engagement", report.user_ids.join(", "))
                    .field("Users tracking habits", report.users_tracking_habits.to_string())
                    .field("Habits", report.total_habits.to_string())
                    .field("Completions", report.total_completions.to_string()))
            }
            "stages" => {
                let report = self.admin.stage_report().await?;
                let mut reply = Reply::titled(
                    "Roadmap stages",
                    format!("{} users with roadmaps", report.users_with_roadmaps),
                );
                for (stage, count) in report.by_stage {
                    reply = reply.field(stage, count.to_string());
                }
                Ok(reply)
            }
            "wizards" => {
                let report = self.admin.wizard_report().await?;
                let body = if report.in_progress.is_empty() {
                    "No wizards in progress.".to_string()
                } else {
                    report
                        .in_progress
                        .iter()
                        .map(|w| format!("{} {} {}/{}", w.user_id, w.flow, w.step, w.total))
                        .collect::<Vec<_>>()
                        .join("\n")
                };
                Ok(Reply::titled("Wizards in progress", body))
            }
            other => Err(unknown_action(
                "admin_reports",
                other,
                "engagement, stages, wizards",
            )),
        }
    }
}
