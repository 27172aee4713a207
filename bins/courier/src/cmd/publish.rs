use clap::Args;

use courier_api::{DeliveryError, DeliveryErrorKind, DeliveryReport, Message};
use courier_session::PublisherSession;

use super::config::Effective;
use super::error::CliError;
use super::parse_pair;

#[derive(Args, Clone, Debug)]
pub struct PublishArgs {
    /// Topic назначения
    pub topic: String,

    /// [KEY] VALUE — ключ необязателен
    #[arg(num_args = 1..=2, required = true, value_names = ["KEY", "VALUE"])]
    pub key_value: Vec<String>,

    /// Явная партиция
    #[arg(long)]
    pub partition: Option<u32>,

    /// Заголовок, key=value (можно повторять)
    #[arg(long = "header", value_name = "KEY=VALUE")]
    pub headers: Vec<String>,
}

impl PublishArgs {
    fn message(&self) -> Result<Message, CliError> {
        let (key, value) = match self.key_value.as_slice() {
            [value] => (None, value),
            [key, value] => (Some(key), value),
            _ => return Err(CliError::Usage("expected [KEY] VALUE".into())),
        };

        let mut message = Message::new(self.topic.as_str(), value.as_bytes());
        if let Some(key) = key {
            message = message.with_key(key.as_bytes());
        }
        if let Some(partition) = self.partition {
            message = message.with_partition(partition);
        }
        for raw in &self.headers {
            let (k, v) = parse_pair(raw)?;
            message = message.with_header(k, v.into_bytes());
        }
        Ok(message)
    }
}

pub async fn run(eff: &Effective, args: &PublishArgs) -> Result<(), CliError> {
    eff.require_persistent("publish")?;
    let message = args.message()?;
    let publisher = PublisherSession::new(eff.cluster.clone(), eff.connector()?);

    let report = single_report(publisher.publish(vec![message]).await?)?;
    println!(
        "delivered to {} partition {} offset {}",
        report.topic, report.partition, report.offset
    );
    Ok(())
}

/// Отчёт по единственному отправленному сообщению. Пустой ответ — сбой
/// доставки, а не ошибка аргументов.
fn single_report(mut reports: Vec<Result<DeliveryReport, DeliveryError>>) -> Result<DeliveryReport, CliError> {
    let report = reports.pop().unwrap_or_else(|| {
        Err(DeliveryError::new(
            DeliveryErrorKind::Timeout,
            "no delivery report returned",
        ))
    })?;
    Ok(report)
}
