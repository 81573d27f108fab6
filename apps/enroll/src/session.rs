//! Line-driven terminal front end for the form controller.

use std::{
    fmt::Write as _,
    future::Future,
    io::{self, Write},
    sync::Arc,
};

use anyhow::Result;
use form_core::{FormController, FormEvent, FormView, SubmitAttempt, ADVISORY_MESSAGE};
use shared::{Field, FormProfile};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    sync::broadcast::{
        self,
        error::{RecvError, TryRecvError},
    },
    task::JoinHandle,
};
use tracing::{info, warn};

const BUSY_MESSAGE: &str = "Ariza yuborilmoqda, iltimos kuting...";
const HELP: &str = "\
Buyruqlar:
  name <ism>          ismni kiriting
  city <kod>          manzilni tanlang (bo'sh qoldirsangiz tozalanadi)
  phone <raqam>       telefon raqamini kiriting
  subject <kod>       fanni tanlang
  options             mavjud kodlar ro'yxati
  show                formani ko'rsatish
  submit              ro'yxatdan o'tish
  reset               formani tozalash
  quit                chiqish";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Name(String),
    City(String),
    Phone(String),
    Subject(String),
    Submit,
    Show,
    Reset,
    Options,
    Help,
    Quit,
    Empty,
}

pub fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Empty);
    }

    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let input = match command.to_ascii_lowercase().as_str() {
        "name" => Input::Name(rest.to_string()),
        "city" => Input::City(rest.to_ascii_lowercase()),
        "phone" => Input::Phone(rest.to_string()),
        "subject" => Input::Subject(rest.to_ascii_lowercase()),
        "submit" | "send" => Input::Submit,
        "show" => Input::Show,
        "reset" => Input::Reset,
        "options" => Input::Options,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => return Err(format!("noma'lum buyruq: {other} (yordam uchun: help)")),
    };
    Ok(input)
}

fn field_label(field: Field) -> &'static str {
    match field {
        Field::Name => "Ism",
        Field::City => "Yashash manzili",
        Field::Phone => "Telefon raqam",
        Field::Subject => "Fan",
    }
}

pub fn render_view(view: &FormView, profile: &FormProfile) -> String {
    let mut out = String::new();
    for field in Field::ALL {
        let raw = view.state.value(field);
        let shown = match field {
            Field::City => profile.city_label(raw).unwrap_or(raw),
            Field::Subject => profile.subject_label(raw).unwrap_or(raw),
            _ => raw,
        };
        let _ = writeln!(out, "{:<16} {shown}", format!("{}:", field_label(field)));
        if let Some(message) = view.errors.get(field) {
            let _ = writeln!(out, "{:<16} ! {message}", "");
        }
    }
    if let Some(advisory) = view.advisory_message() {
        let _ = writeln!(out, "{advisory}");
    }
    if let (Some(outcome), Some(contact)) = (&view.status.outcome, &view.fallback_contact) {
        let _ = writeln!(out, "{}", outcome.headline());
        let _ = writeln!(out, "Telefon: {contact}");
    }
    out
}

pub fn render_options(profile: &FormProfile) -> String {
    let mut out = String::from("Manzil:\n");
    for option in profile.cities {
        let _ = writeln!(out, "  {:<16} {}", option.value, option.label);
    }
    out.push_str("Fan:\n");
    for option in profile.subject.options() {
        let _ = writeln!(out, "  {:<16} {}", option.value, option.label);
    }
    out
}

/// Text to print for `event`, if any. Title changes are emitted as the
/// xterm OSC 0 sequence.
pub fn render_event(event: &FormEvent, fallback_contact: &str) -> Option<String> {
    match event {
        FormEvent::FieldChanged {
            field: Field::Phone,
            value,
        } => Some(format!("{}: {value}\n", field_label(Field::Phone))),
        FormEvent::FieldChanged { .. } | FormEvent::Reset => None,
        FormEvent::AdvisoryChanged { visible: true } => Some(format!("{ADVISORY_MESSAGE}\n")),
        FormEvent::AdvisoryChanged { visible: false } => None,
        FormEvent::ValidationFailed { errors } => {
            let mut out = String::new();
            for (field, message) in errors.iter() {
                let _ = writeln!(out, "  {}: {message}", field_label(field));
            }
            Some(out)
        }
        FormEvent::SubmissionStarted => Some(format!("{BUSY_MESSAGE}\n")),
        FormEvent::SubmissionFinished { outcome } => Some(format!(
            "{}\nTelefon: {fallback_contact}\n",
            outcome.headline()
        )),
        FormEvent::ReminderStarted { title, focus_name } => {
            let mut out = format!("\x1b]0;{title}\x07>>> {title} <<<\n");
            if *focus_name {
                out.push_str("name> ");
            }
            Some(out)
        }
        FormEvent::ReminderEnded { title } => Some(format!("\x1b]0;{title}\x07")),
    }
}

async fn handle(
    controller: &Arc<FormController>,
    input: Input,
    pending: &mut Option<JoinHandle<SubmitAttempt>>,
    out: &mut impl Write,
) -> io::Result<()> {
    let result = match input {
        Input::Name(name) => {
            controller.set_name(name).await;
            Ok(())
        }
        Input::City(code) => controller.select_city(&code).await,
        Input::Phone(raw) => {
            controller.input_phone(&raw).await;
            Ok(())
        }
        Input::Subject(code) => controller.select_subject(&code).await,
        Input::Submit => {
            if pending.as_ref().is_some_and(|task| !task.is_finished()) {
                writeln!(out, "{BUSY_MESSAGE}")?;
            } else {
                let controller = Arc::clone(controller);
                *pending = Some(tokio::spawn(async move { controller.submit().await }));
            }
            Ok(())
        }
        Input::Show => {
            let view = controller.snapshot().await;
            write!(out, "{}", render_view(&view, controller.profile()))?;
            Ok(())
        }
        Input::Reset => {
            if !controller.reset().await {
                writeln!(out, "{BUSY_MESSAGE}")?;
            }
            Ok(())
        }
        Input::Options => {
            write!(out, "{}", render_options(controller.profile()))?;
            Ok(())
        }
        Input::Help => {
            writeln!(out, "{HELP}")?;
            Ok(())
        }
        Input::Quit | Input::Empty => Ok(()),
    };

    if let Err(error) = result {
        writeln!(out, "{error}")?;
    }
    out.flush()
}

fn print_event(event: &FormEvent, fallback_contact: &str, out: &mut impl Write) -> io::Result<()> {
    if let Some(text) = render_event(event, fallback_contact) {
        write!(out, "{text}")?;
        out.flush()?;
    }
    Ok(())
}

fn print_queued_events(
    events: &mut broadcast::Receiver<FormEvent>,
    fallback_contact: &str,
    out: &mut impl Write,
) -> io::Result<()> {
    loop {
        match events.try_recv() {
            Ok(event) => print_event(&event, fallback_contact, out)?,
            Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "terminal fell behind form events"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => return Ok(()),
        }
    }
}

pub async fn run(controller: Arc<FormController>, fallback_contact: String) -> Result<()> {
    let input = BufReader::new(tokio::io::stdin());
    let interrupt = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    drive(controller, &fallback_contact, input, &mut io::stdout(), interrupt).await
}

/// Runs the session until `input` ends, `quit` is typed or `interrupt`
/// resolves. A registration that is still being sent is awaited and its
/// outcome printed before the reminder is shut down.
pub async fn drive<R, W>(
    controller: Arc<FormController>,
    fallback_contact: &str,
    input: R,
    out: &mut W,
    interrupt: impl Future<Output = ()>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut events = controller.subscribe_events();
    let mut lines = input.lines();
    let mut pending: Option<JoinHandle<SubmitAttempt>> = None;
    tokio::pin!(interrupt);

    controller.start_reminder().await;
    writeln!(out, "{HELP}")?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_input(&line) {
                    Ok(Input::Quit) => break,
                    Ok(input) => handle(&controller, input, &mut pending, out).await?,
                    Err(message) => writeln!(out, "{message}")?,
                }
            }
            event = events.recv() => match event {
                Ok(event) => print_event(&event, fallback_contact, out)?,
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "terminal fell behind form events"),
                Err(RecvError::Closed) => break,
            },
            _ = &mut interrupt => break,
        }
    }

    if let Some(task) = pending.take() {
        if !task.is_finished() {
            info!("waiting for the registration to finish sending");
        }
        task.await?;
    }
    controller.shutdown().await;
    print_queued_events(&mut events, fallback_contact, out)?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
