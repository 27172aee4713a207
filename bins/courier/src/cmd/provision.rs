use clap::Args;

use courier_api::TopicSpec;
use courier_session::{AdminSession, TopicCreationResult};

use super::config::Effective;
use super::error::CliError;
use super::parse_pair;

#[derive(Args, Clone, Debug)]
pub struct ProvisionArgs {
    /// Имя topic'а
    pub name: String,

    /// Число партиций
    pub partitions: u32,

    /// Replication factor
    #[arg(long)]
    pub replication_factor: Option<u16>,

    /// Конфиг topic'а, key=value (можно повторять)
    #[arg(long = "topic-config", value_name = "KEY=VALUE")]
    pub topic_config: Vec<String>,
}

impl ProvisionArgs {
    fn spec(&self) -> Result<TopicSpec, CliError> {
        let mut spec = TopicSpec::new(self.name.as_str(), self.partitions)?;
        if let Some(rf) = self.replication_factor {
            spec = spec.with_replication_factor(rf)?;
        }
        for raw in &self.topic_config {
            let (k, v) = parse_pair(raw)?;
            spec = spec.with_config(k, v);
        }
        Ok(spec)
    }
}

pub async fn run(eff: &Effective, args: &ProvisionArgs) -> Result<(), CliError> {
    let spec = args.spec()?;
    let admin = AdminSession::new(eff.cluster.clone(), eff.connector()?);

    match admin.provision(&spec).await? {
        TopicCreationResult::Created => {
            println!(
                "topic '{}' created ({} partitions, replication factor {})",
                spec.name(),
                spec.num_partitions(),
                spec.replication_factor()
            );
            Ok(())
        }
        TopicCreationResult::AlreadyExists => {
            println!("topic '{}' already exists, left unchanged", spec.name());
            Ok(())
        }
        TopicCreationResult::Failed(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use courier_api::{ClusterConfig, ProvisionErrorKind, TopicSpecError};

    use crate::cmd::config::Backend;
    use super::*;

    fn file_backend(dir: &Path) -> Effective {
        Effective {
            cluster: ClusterConfig::new(["file:local"]),
            backend: Backend::File {
                data_dir: dir.to_path_buf(),
            },
        }
    }

    fn args(name: &str, partitions: u32) -> ProvisionArgs {
        ProvisionArgs {
            name: name.into(),
            partitions,
            replication_factor: None,
            topic_config: Vec::new(),
        }
    }

    #[test]
    fn spec_from_args() {
        let mut a = args("rider-updates", 2);
        a.replication_factor = Some(3);
        a.topic_config = vec!["cleanup.policy=compact".into()];

        let spec = a.spec().unwrap();
        assert_eq!(spec.num_partitions(), 2);
        assert_eq!(spec.replication_factor(), 3);
        assert_eq!(spec.config_entries().get("cleanup.policy").map(String::as_str), Some("compact"));
    }

    #[test]
    fn invalid_spec_exits_with_usage_code() {
        let err = args("rider-updates", 0).spec().unwrap_err();
        assert!(matches!(err, CliError::Spec(TopicSpecError::ZeroPartitions)));
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn existing_topic_is_still_success() {
        let dir = tempfile::tempdir().unwrap();
        let eff = file_backend(dir.path());

        run(&eff, &args("rider-updates", 2)).await.unwrap();
        run(&eff, &args("rider-updates", 5)).await.unwrap();

        assert!(dir.path().join("topics/rider-updates/1.jsonl").is_file());
        assert!(!dir.path().join("topics/rider-updates/2.jsonl").exists());
    }

    #[tokio::test]
    async fn rejected_topic_exits_with_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args("replicated", 1);
        a.replication_factor = Some(3);

        let err = run(&file_backend(dir.path()), &a).await.unwrap_err();
        assert!(matches!(&err, CliError::Provision(e) if e.kind() == ProvisionErrorKind::InvalidSpec));
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn memory_backend_provisions_as_dry_run() {
        let eff = Effective {
            cluster: ClusterConfig::new(["memory:local"]),
            backend: Backend::Memory,
        };
        run(&eff, &args("rider-updates", 3)).await.unwrap();
    }
}
