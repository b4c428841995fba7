mod common;

use std::{collections::BTreeSet, sync::Arc};

use common::{RecordingBuilder, RecordingProvider, init_logger, nz};
use datasets::EmnistDatasets;
use learning::ClientData;
use tasks::{ClientDatasetsFn, ExperimentConfig, TaskConfig, TaskDatasets, TaskErr};

fn train_data(num_clients: usize) -> Arc<dyn ClientData> {
    common::emnist(num_clients)
        .federated_train(nz(2), nz(1), false)
        .unwrap()
}

#[test]
fn seeded_sampling_is_reproducible_per_round() {
    init_logger();
    let data = train_data(20);
    let first = ClientDatasetsFn::new(data.clone(), nz(5), Some(42));
    let second = ClientDatasetsFn::new(data, nz(5), Some(42));

    let rounds: Vec<_> = (0..10)
        .map(|round| first.sample_client_ids(round).unwrap())
        .collect();

    for (round, ids) in rounds.iter().enumerate() {
        assert_eq!(ids, &second.sample_client_ids(round as u64).unwrap());
        assert_eq!(ids, &first.sample_client_ids(round as u64).unwrap());
    }
    assert!(rounds.iter().any(|ids| ids != &rounds[0]));
}

#[test]
fn sampled_clients_are_distinct() {
    let data = train_data(6);
    let sample = ClientDatasetsFn::new(data.clone(), nz(6), None);

    let ids = sample.sample_client_ids(3).unwrap();
    let distinct: BTreeSet<_> = ids.iter().collect();
    assert_eq!(distinct.len(), 6);
    assert!(ids.iter().all(|id| data.client_ids().contains(id)));
}

#[test]
fn datasets_follow_the_sampled_ids() {
    let data = train_data(8);
    let sample = ClientDatasetsFn::new(data.clone(), nz(3), Some(1));

    let ids = sample.sample_client_ids(4).unwrap();
    let datasets = sample.call(4).unwrap();

    assert_eq!(datasets.len(), 3);
    for (id, dataset) in ids.iter().zip(&datasets) {
        assert_eq!(dataset, &data.dataset_for_client(id).unwrap());
    }
}

#[test]
fn asking_for_more_clients_than_exist_is_an_error() {
    let sample = ClientDatasetsFn::new(train_data(3), nz(4), Some(0));
    assert!(matches!(
        sample.call(0),
        Err(TaskErr::NotEnoughClients {
            requested: 4,
            available: 3
        })
    ));
}

#[test]
fn experiment_configs_dispatch_to_their_task() {
    init_logger();
    let config = ExperimentConfig {
        task: TaskConfig::Shakespeare {
            sequence_length: nz(12),
        },
        client_batch_size: nz(4),
        client_epochs_per_round: nz(1),
        clients_per_round: nz(2),
        client_datasets_random_seed: Some(9),
    };
    let builder = Arc::new(RecordingBuilder::default());
    let shakespeare = common::shakespeare();

    config
        .configure(
            builder.clone(),
            TaskDatasets::Shakespeare(&shakespeare),
            Arc::new(RecordingProvider::default()),
        )
        .unwrap();
    assert!(builder.calls()[0].client_weight_fn.is_some());

    let emnist = common::emnist(3);
    let mismatch = config.configure(
        builder,
        TaskDatasets::Emnist(&emnist),
        Arc::new(RecordingProvider::default()),
    );
    assert!(matches!(
        mismatch,
        Err(TaskErr::TaskMismatch {
            config: "shakespeare",
            datasets: "emnist"
        })
    ));
    assert_eq!(emnist.calls(), 0);
}
