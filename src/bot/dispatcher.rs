//! Routes inbound events to the wizard, the coach and the admin commands.
//!
//! Direct messages go to the active wizard (intake before offer builder);
//! with no wizard they become free chat. Every error becomes a short reply;
//! internal detail is only attached for admins.

use std::collections::BTreeMap;

use crate::admin::{Admin, AdminPolicy};
use crate::coaching::{Coach, HiringMode};
use crate::error::{AdminError, CoachingError, CommandError, FinalizeError, WizardError};
use crate::memory::{HabitFrequency, PushLevel, Roadmap, StageStatus};
use crate::wizard::{Finalizer, FlowType, WizardEngine, WizardState};

use super::command::InboundEvent;
use super::reply::Reply;

const HELP: &str = "\
/start - business intake (/start redo to redo it)
/offer - build your offer
/cancel - stop the current questions
/retry - finish a flow that failed to complete
/plan [view|set_stage|complete_task] - your roadmap
/habits [add|list|complete|stats] - habit tracking
/pushmode [on|off|toggle] level=normal|strong|extreme
/mindset <what's on your mind>
/marketing type=<asset> <instructions>
/sales <call transcript>
/hiring [jd|interview|sop] <role>
Anything else you send is a coaching conversation.";

/// Arguments of one command invocation.
#[derive(Debug, Clone, Default)]
pub(crate) struct CommandArgs {
    pub subcommand: Option<String>,
    pub options: BTreeMap<String, String>,
    pub text: String,
}

impl CommandArgs {
    pub fn opt(&self, name: &str) -> Option<&str> {
        self.options
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, name: &str) -> Result<&str, CommandError> {
        self.opt(name)
            .ok_or_else(|| CommandError::Usage(format!("Missing {name}=...")))
    }

    /// The named option, or the free text when the option is absent.
    pub fn opt_or_text(&self, name: &str) -> Option<&str> {
        self.opt(name).or_else(|| {
            let text = self.text.trim();
            (!text.is_empty()).then_some(text)
        })
    }

    pub fn sub(&self) -> Option<&str> {
        self.subcommand.as_deref()
    }
}

pub struct Dispatcher {
    wizard: WizardEngine,
    finalizer: Finalizer,
    coach: Coach,
    pub(crate) admin: Admin,
}

impl Dispatcher {
    pub fn new(coach: Coach, wizard: WizardEngine, policy: AdminPolicy) -> Self {
        let finalizer = Finalizer::new(
            wizard.clone(),
            coach.memory().clone(),
            coach.llm().clone(),
        );
        let admin = Admin::new(coach.clone(), wizard.clone(), policy);
        Self {
            wizard,
            finalizer,
            coach,
            admin,
        }
    }

    pub fn wizard(&self) -> &WizardEngine {
        &self.wizard
    }

    pub fn coach(&self) -> &Coach {
        &self.coach
    }

    pub async fn handle(&self, event: InboundEvent) -> Reply {
        let user_id = event.user_id().to_string();
        let user_name = event.user_name().to_string();

        let (result, is_admin) = match event {
            InboundEvent::DirectMessageReceived { text, .. } => {
                tracing::debug!(
                    user_id = %user_id,
                    preview = %text.chars().take(100).collect::<String>(),
                    "Direct message"
                );
                (self.direct_message(&user_id, &user_name, &text).await, false)
            }
            InboundEvent::CommandInvoked {
                command,
                subcommand,
                options,
                text,
                roles,
                ..
            } => {
                tracing::debug!(user_id = %user_id, command = %command, "Command");
                let is_admin = self.admin.is_admin(&user_id, &roles);
                let args = CommandArgs {
                    subcommand,
                    options,
                    text,
                };
                let result = if command.starts_with("admin_") {
                    self.admin_command(&user_id, &roles, &command, &args).await
                } else {
                    self.command(&user_id, &user_name, &command, &args).await
                };
                (result, is_admin)
            }
        };

        match result {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Event failed");
                let reply = Reply::error(user_message(&e));
                if is_admin {
                    reply.field("Detail", e.to_string())
                } else {
                    reply
                }
            }
        }
    }

    async fn direct_message(
        &self,
        user_id: &str,
        user_name: &str,
        text: &str,
    ) -> Result<Reply, CommandError> {
        let Some(state) = self.wizard.active_flow(user_id).await? else {
            let answer = self.coach.chat(user_id, text).await?;
            return Ok(Reply::text(answer));
        };

        if state.is_complete() {
            tracing::info!(user_id, flow = %state.flow, "Retrying finalization on new message");
            return self.finalize(user_id, user_name, state.flow).await;
        }

        let outcome = self.wizard.submit_answer(user_id, state.flow, text).await?;
        if outcome.done {
            return self.finalize(user_id, user_name, state.flow).await;
        }
        Ok(question_reply(&outcome.state))
    }

    async fn finalize(
        &self,
        user_id: &str,
        user_name: &str,
        flow: FlowType,
    ) -> Result<Reply, CommandError> {
        match flow {
            FlowType::Intake => {
                let outcome = self.finalizer.finalize_intake(user_id, user_name).await?;
                let mut reply = Reply::titled("Your business diagnosis", outcome.diagnosis);
                if !outcome.profile.bottlenecks.is_empty() {
                    reply = reply.field("Bottlenecks", outcome.profile.bottlenecks.join(", "));
                }
                reply = match outcome.roadmap.as_ref().and_then(Roadmap::current_stage) {
                    Some(stage) => reply.field("Current stage", stage.name.clone()),
                    None => reply.field(
                        "Roadmap",
                        "Not ready this time. Your profile is saved; /plan will show it once built.",
                    ),
                };
                Ok(reply)
            }
            FlowType::OfferBuilder => {
                let outcome = self.finalizer.finalize_offer(user_id).await?;
                let offer = &outcome.offer;
                let mut reply = Reply::titled("Your offer", outcome.summary);
                for (name, value) in [
                    ("Name", &offer.offer_name),
                    ("Promise", &offer.promise),
                    ("Price", &offer.price_point),
                    ("Mechanism", &offer.unique_mechanism),
                ] {
                    if !value.is_empty() {
                        reply = reply.field(name, value.clone());
                    }
                }
                Ok(reply)
            }
        }
    }

    async fn command(
        &self,
        user_id: &str,
        user_name: &str,
        command: &str,
        args: &CommandArgs,
    ) -> Result<Reply, CommandError> {
        match command {
            "help" => Ok(Reply::titled("Commands", HELP)),
            "start" => self.start_intake(user_id, args).await,
            "offer" => {
                let state = self.wizard.start(user_id, FlowType::OfferBuilder).await?;
                Ok(question_reply(&state))
            }
            "cancel" => self.cancel(user_id).await,
            "retry" => self.retry(user_id, user_name).await,
            "plan" => self.plan(user_id, args).await,
            "habits" => self.habits(user_id, args).await,
            "pushmode" => self.pushmode(user_id, args).await,
            "mindset" => {
                let message = args.opt_or_text("message").unwrap_or_default();
                Ok(Reply::text(self.coach.mindset(user_id, message).await?))
            }
            "marketing" => {
                let kind = args.opt("type").unwrap_or("content ideas");
                let extra = (!args.text.trim().is_empty()).then_some(args.text.trim());
                Ok(Reply::titled(
                    format!("Marketing: {kind}"),
                    self.coach.marketing_assets(user_id, kind, extra).await?,
                ))
            }
            "sales" => {
                let transcript = args
                    .opt_or_text("transcript")
                    .ok_or_else(|| CommandError::Usage("Paste the call transcript after /sales.".into()))?;
                Ok(Reply::titled(
                    "Sales call review",
                    self.coach.review_sales_call(user_id, transcript).await?,
                ))
            }
            "hiring" => {
                let mode: HiringMode = args
                    .sub()
                    .or(args.opt("mode"))
                    .unwrap_or("jd")
                    .parse()
                    .map_err(CommandError::Usage)?;
                let role = args
                    .opt_or_text("role")
                    .ok_or_else(|| CommandError::Usage("Which role? e.g. /hiring jd appointment setter".into()))?;
                Ok(Reply::titled(
                    format!("Hiring ({mode}): {role}"),
                    self.coach.hiring_doc(user_id, mode, role).await?,
                ))
            }
            other => Ok(Reply::error(format!(
                "Unknown command /{other}. Send /help for the list."
            ))),
        }
    }

    async fn start_intake(&self, user_id: &str, args: &CommandArgs) -> Result<Reply, CommandError> {
        let redo = args.sub() == Some("redo");
        if !redo && self.coach.memory().profile(user_id).await?.is_some() {
            return Ok(Reply::text(
                "You already completed intake. Send /start redo to answer the questions again.",
            ));
        }
        let state = self.wizard.start(user_id, FlowType::Intake).await?;
        Ok(question_reply(&state))
    }

    async fn cancel(&self, user_id: &str) -> Result<Reply, CommandError> {
        let mut cancelled = Vec::new();
        for flow in FlowType::ALL {
            if self.wizard.cancel(user_id, flow).await? {
                cancelled.push(flow.to_string());
            }
        }
        Ok(if cancelled.is_empty() {
            Reply::text("Nothing to cancel.")
        } else {
            Reply::text(format!("Cancelled: {}.", cancelled.join(", ")))
        })
    }

    async fn retry(&self, user_id: &str, user_name: &str) -> Result<Reply, CommandError> {
        for flow in FlowType::ALL {
            if let Some(state) = self.wizard.load(user_id, flow).await?
                && state.is_complete()
            {
                return self.finalize(user_id, user_name, flow).await;
            }
        }
        Ok(Reply::text("Nothing is waiting to be finished."))
    }

    async fn plan(&self, user_id: &str, args: &CommandArgs) -> Result<Reply, CommandError> {
        match args.sub().unwrap_or("view") {
            "view" => {
                let roadmap = self.coach.roadmap(user_id).await?;
                Ok(roadmap_reply(&roadmap))
            }
            "set_stage" => {
                let stage = args
                    .opt_or_text("stage")
                    .ok_or_else(|| CommandError::Usage("Missing stage=...".into()))?;
                let roadmap = self.coach.set_stage(user_id, stage).await?;
                Ok(roadmap_reply(&roadmap))
            }
            "complete_task" => {
                let task = args
                    .opt_or_text("task")
                    .ok_or_else(|| CommandError::Usage("Missing task=...".into()))?;
                let roadmap = self.coach.roadmap(user_id).await?;
                let stage = args
                    .opt("stage")
                    .unwrap_or(&roadmap.current_stage_id)
                    .to_string();
                let roadmap = self.coach.complete_task(user_id, &stage, task).await?;
                Ok(roadmap_reply(&roadmap))
            }
            other => Err(CommandError::Usage(format!(
                "Unknown /plan action '{other}' (view, set_stage, complete_task)"
            ))),
        }
    }

    async fn habits(&self, user_id: &str, args: &CommandArgs) -> Result<Reply, CommandError> {
        match args.sub().unwrap_or("list") {
            "add" => {
                let frequency: HabitFrequency = args
                    .opt("frequency")
                    .unwrap_or("daily")
                    .parse()
                    .map_err(CommandError::Usage)?;
                let description = args
                    .opt_or_text("description")
                    .ok_or_else(|| CommandError::Usage("Describe the habit.".into()))?;
                let habit = self
                    .coach
                    .add_habit(user_id, description, frequency, args.opt("cron"))
                    .await?;
                Ok(Reply::titled("Habit added", habit.description)
                    .field("Id", habit.id)
                    .field("Frequency", habit.frequency.to_string()))
            }
            "list" => {
                let habits = self.coach.list_habits(user_id).await?;
                if habits.is_empty() {
                    return Ok(Reply::text("No habits yet. Try /habits add Call five leads"));
                }
                let body = habits
                    .iter()
                    .map(|h| format!("{} ({}) [{}]", h.description, h.frequency, h.id))
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(Reply::titled("Your habits", body))
            }
            "complete" => {
                let habit_id = args
                    .opt_or_text("id")
                    .ok_or_else(|| CommandError::Usage("Missing id=...".into()))?;
                let newly = self.coach.complete_habit(user_id, habit_id).await?;
                Ok(Reply::text(if newly {
                    "Logged for today."
                } else {
                    "Already logged for today."
                }))
            }
            "stats" => {
                let stats = self.coach.habit_stats(user_id).await?;
                let mut reply = Reply::titled("Habit completions", "");
                for stat in stats {
                    reply = reply.field(stat.habit.description, stat.completions.to_string());
                }
                Ok(reply)
            }
            other => Err(CommandError::Usage(format!(
                "Unknown /habits action '{other}' (add, list, complete, stats)"
            ))),
        }
    }

    async fn pushmode(&self, user_id: &str, args: &CommandArgs) -> Result<Reply, CommandError> {
        let current = self.coach.memory().pushmode(user_id).await?.unwrap_or_default();
        let level = match args.opt("level") {
            Some(raw) => raw.parse::<PushLevel>().map_err(CommandError::Usage)?,
            None => current.level,
        };
        let enabled = match args.sub() {
            None | Some("on") => true,
            Some("off") => false,
            Some("toggle") => !current.enabled,
            Some(other) => {
                return Err(CommandError::Usage(format!(
                    "Unknown /pushmode action '{other}' (on, off, toggle)"
                )));
            }
        };
        let state = self.coach.set_pushmode(user_id, enabled, level).await?;
        Ok(Reply::titled("Push mode", "Updated.")
            .field("Enabled", if state.enabled { "yes" } else { "no" })
            .field("Level", state.level.to_string()))
    }
}

fn question_reply(state: &WizardState) -> Reply {
    match state.current_question() {
        Some(q) => Reply::text(format!(
            "({}/{}) {}",
            state.step_index + 1,
            state.total_steps(),
            q.prompt
        )),
        None => Reply::text("All questions answered. Send /retry to finish."),
    }
}

pub(crate) fn roadmap_reply(roadmap: &Roadmap) -> Reply {
    let body = roadmap
        .stages
        .iter()
        .map(|s| {
            let marker = match s.status {
                StageStatus::Active => "▶",
                StageStatus::Completed => "✓",
                StageStatus::Locked => "·",
            };
            format!("{marker} {} ({})", s.name, s.id)
        })
        .collect::<Vec<_>>()
        .join("\n");
    let mut reply = Reply::titled("Your roadmap", body);
    if let Some(stage) = roadmap.current_stage() {
        if !stage.tasks.is_empty() {
            reply = reply.field("Open tasks", stage.tasks.join("; "));
        }
        if !stage.kpis.is_empty() {
            reply = reply.field("KPIs", stage.kpis.join("; "));
        }
    }
    reply
}

/// Human text for a failed event. Never includes internal detail.
fn user_message(error: &CommandError) -> String {
    match error {
        CommandError::Usage(msg) => msg.clone(),
        CommandError::Wizard(WizardError::NoActiveFlow { .. })
        | CommandError::Finalize(FinalizeError::NoActiveFlow { .. }) => {
            "There are no questions in progress. Send /start or /offer to begin.".into()
        }
        CommandError::Wizard(WizardError::Contention { .. }) => {
            "Your answers arrived too quickly. Please send that one again.".into()
        }
        CommandError::Finalize(FinalizeError::Generation(_)) => {
            "I couldn't finish that just now. Your answers are saved; send /retry to try again."
                .into()
        }
        CommandError::Coaching(e) | CommandError::Admin(AdminError::Coaching(e)) => match e {
            CoachingError::Missing { record } => {
                format!("No {record} yet. Send /start to complete your intake first.")
            }
            CoachingError::NotFound { .. } | CoachingError::InvalidInput(_) => e.to_string(),
            CoachingError::Generation(_) => {
                "The coach is unavailable right now. Please try again shortly.".into()
            }
            CoachingError::Store(_) => "Something went wrong. Please try again.".into(),
        },
        CommandError::Admin(AdminError::Unauthorized) => "That command is for admins only.".into(),
        CommandError::Admin(e @ (AdminError::UnknownField(_) | AdminError::InvalidInput(_))) => {
            e.to_string()
        }
        _ => "Something went wrong. Please try again.".into(),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::coaching::CoachDefaults;
    use crate::error::LlmError;
    use crate::llm::{CompletionRequest, CompletionResponse, LlmProvider};
    use crate::memory::UserMemory;
    use crate::store::{MemoryStore, StateStore};

    /// Replies from a queue; falls back to "ok" when empty.
    #[derive(Default)]
    pub struct QueueLlm {
        pub replies: Mutex<VecDeque<Result<String, ()>>>,
    }

    impl QueueLlm {
        pub fn push_ok(&self, text: &str) {
            self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        }

        pub fn push_err(&self) {
            self.replies.lock().unwrap().push_back(Err(()));
        }
    }

    #[async_trait]
    impl LlmProvider for QueueLlm {
        fn model_name(&self) -> &str {
            "queue"
        }

        async fn complete(&self, _: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(content)) => Ok(CompletionResponse { content }),
                Some(Err(())) => Err(LlmError::RequestFailed {
                    provider: "queue".into(),
                    reason: "scripted failure".into(),
                }),
                None => Ok(CompletionResponse {
                    content: "ok".into(),
                }),
            }
        }
    }

    pub fn dispatcher() -> (Dispatcher, Arc<QueueLlm>) {
        let llm = Arc::new(QueueLlm::default());
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let coach = Coach::new(
            UserMemory::new(store.clone()),
            llm.clone(),
            CoachDefaults::default(),
        );
        let dispatcher = Dispatcher::new(
            coach,
            WizardEngine::new(store),
            AdminPolicy::new(vec!["root".to_string()], None),
        );
        (dispatcher, llm)
    }

    pub fn dm(user: &str, text: &str) -> InboundEvent {
        InboundEvent::DirectMessageReceived {
            user_id: user.into(),
            user_name: None,
            text: text.into(),
        }
    }

    pub fn cmd(user: &str, line: &str) -> InboundEvent {
        InboundEvent::from_text(user, None, line)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    const DIAGNOSIS: &str = "Lead flow is your constraint.\n[BOTTLENECK_MAP_JSON]\n{\"bottlenecks\":[\"lead generation\"],\"bottleneckMap\":{\"leads\":\"high\"}}";
    const ROADMAP: &str = r#"{"currentStageId":"stage-1","stages":[{"id":"stage-1","name":"Fill the pipeline","tasks":["Post daily"],"status":"active"},{"id":"stage-2","name":"Scale","status":"locked"}]}"#;

    async fn answer_all(d: &Dispatcher, user: &str, n: usize) -> Reply {
        let mut last = Reply::default();
        for i in 0..n {
            last = d.handle(dm(user, &format!("answer {i}"))).await;
        }
        last
    }

    #[tokio::test]
    async fn dm_without_wizard_is_chat() {
        let (d, llm) = dispatcher();
        llm.push_ok("Keep going.");
        let reply = d.handle(dm("U1", "hello")).await;
        assert_eq!(reply.body, "Keep going.");
        assert_eq!(
            d.coach.memory().recent_history("U1", 10).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn start_asks_first_question_then_advances() {
        let (d, _) = dispatcher();
        let reply = d.handle(cmd("U1", "/start")).await;
        assert!(reply.body.starts_with("(1/10)"));

        let reply = d.handle(dm("U1", "8k a month")).await;
        assert!(reply.body.starts_with("(2/10)"));

        let state = d.wizard.load("U1", FlowType::Intake).await.unwrap().unwrap();
        assert_eq!(state.answer("currentRevenue"), "8k a month");
    }

    #[tokio::test]
    async fn intake_completion_finalizes() {
        let (d, llm) = dispatcher();
        llm.push_ok(DIAGNOSIS);
        llm.push_ok(ROADMAP);
        d.handle(cmd("U1", "/start")).await;
        let reply = answer_all(&d, "U1", 10).await;

        assert!(!reply.error, "{reply:?}");
        assert_eq!(reply.body, "Lead flow is your constraint.");
        assert!(reply.fields.iter().any(|f| f.value == "Fill the pipeline"));
        assert!(d.wizard.active_flow("U1").await.unwrap().is_none());

        let again = d.handle(cmd("U1", "/start")).await;
        assert!(again.body.contains("/start redo"));
        let redo = d.handle(cmd("U1", "/start redo")).await;
        assert!(redo.body.starts_with("(1/10)"));
    }

    #[tokio::test]
    async fn failed_finalization_keeps_answers_and_retries() {
        let (d, llm) = dispatcher();
        d.handle(cmd("U2", "/offer")).await;
        llm.push_err();
        let reply = answer_all(&d, "U2", 5).await;
        assert!(reply.error);
        assert!(reply.body.contains("/retry"));
        assert!(reply.fields.is_empty());

        let state = d
            .wizard
            .load("U2", FlowType::OfferBuilder)
            .await
            .unwrap()
            .unwrap();
        assert!(state.is_complete());

        llm.push_ok("A clear offer.\n[OFFER_JSON]\n{\"offerName\":\"Pipeline Sprint\"}");
        let reply = d.handle(cmd("U2", "/retry")).await;
        assert!(!reply.error);
        assert_eq!(reply.body, "A clear offer.");
        assert_eq!(reply.fields[0].value, "Pipeline Sprint");
        assert!(d.wizard.active_flow("U2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let (d, _) = dispatcher();
        assert_eq!(d.handle(cmd("U1", "/cancel")).await.body, "Nothing to cancel.");
        d.handle(cmd("U1", "/offer")).await;
        assert_eq!(
            d.handle(cmd("U1", "/cancel")).await.body,
            "Cancelled: offer_builder."
        );
    }

    #[tokio::test]
    async fn errors_hide_detail_from_users() {
        let (d, _) = dispatcher();
        let reply = d.handle(cmd("U1", "/plan")).await;
        assert!(reply.error);
        assert!(reply.body.contains("No roadmap yet"));
        assert!(reply.fields.is_empty());

        let reply = d.handle(cmd("root", "/plan")).await;
        assert_eq!(reply.fields[0].name, "Detail");
    }

    #[tokio::test]
    async fn habits_round_trip_through_commands() {
        let (d, _) = dispatcher();
        let added = d
            .handle(cmd("U1", "/habits add frequency=weekly Publish a case study"))
            .await;
        let id = added.fields[0].value.clone();

        let done = d.handle(cmd("U1", &format!("/habits complete id={id}"))).await;
        assert_eq!(done.body, "Logged for today.");
        let again = d.handle(cmd("U1", &format!("/habits complete {id}"))).await;
        assert_eq!(again.body, "Already logged for today.");

        let stats = d.handle(cmd("U1", "/habits stats")).await;
        assert_eq!(stats.fields[0].value, "1");
    }

    #[tokio::test]
    async fn pushmode_on_off() {
        let (d, _) = dispatcher();
        let reply = d.handle(cmd("U1", "/pushmode on level=extreme")).await;
        assert_eq!(reply.fields[1].value, "extreme");
        let reply = d.handle(cmd("U1", "/pushmode off")).await;
        assert_eq!(reply.fields[0].value, "no");
        assert_eq!(reply.fields[1].value, "extreme");
    }

    #[tokio::test]
    async fn unknown_command() {
        let (d, _) = dispatcher();
        let reply = d.handle(cmd("U1", "/dance")).await;
        assert!(reply.error);
        assert!(reply.body.contains("/help"));
    }
}
