#[cfg(test)]
mod tests {
    use crate::*;
    use smeshmon_types::*;

    fn identity(byte: u8) -> Identity {
        Identity::from_bytes([byte; IDENTITY_LEN])
    }

    #[test]
    fn test_decode_network_info() {
        let json = r#"{
            "genesisTime": "2023-07-14T08:00:00Z",
            "layerDuration": "300s",
            "genesisId": "AAEC",
            "hrp": "sm",
            "effectiveGenesisLayer": 7,
            "layersPerEpoch": 4032,
            "labelsPerUnit": "4294967296"
        }"#;
        let response: NetworkInfoResponse = serde_json::from_str(json).unwrap();
        let info = response.into_domain().unwrap();

        assert_eq!(info.params.genesis_time, 1_689_321_600_000);
        assert_eq!(info.params.layer_duration, 300);
        assert_eq!(info.params.layers_per_epoch, 4032);
        assert_eq!(info.genesis_id, "000102");
        assert_eq!(info.labels_per_unit, 4_294_967_296);
    }

    #[test]
    fn test_decode_network_info_rejects_zero_layer_duration() {
        let json = r#"{
            "genesisTime": "2023-07-14T08:00:00Z",
            "layerDuration": "0s",
            "genesisId": "AAEC",
            "hrp": "sm",
            "effectiveGenesisLayer": 0,
            "layersPerEpoch": 10,
            "labelsPerUnit": 1
        }"#;
        let response: NetworkInfoResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(response.into_domain(), Err(RpcError::Types(_))));
    }

    fn network_info_with_layer_duration(layer_duration: &str) -> NetworkInfoResponse {
        let json = format!(
            r#"{{
                "genesisTime": "2023-07-14T08:00:00Z",
                "layerDuration": "{layer_duration}",
                "genesisId": "AAEC",
                "hrp": "sm",
                "effectiveGenesisLayer": 0,
                "layersPerEpoch": 10,
                "labelsPerUnit": 1
            }}"#
        );
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_decode_network_info_names_bad_layer_duration() {
        for layer_duration in ["1500ms", "-300s", "250ms"] {
            let err = network_info_with_layer_duration(layer_duration)
                .into_domain()
                .unwrap_err();
            assert!(matches!(
                err,
                RpcError::Types(SmeshmonError::InvalidNetworkParams(_))
            ));
            assert!(err.to_string().contains(layer_duration));
        }
        let info = network_info_with_layer_duration("5m0s").into_domain().unwrap();
        assert_eq!(info.params.layer_duration, 300);
    }

    #[test]
    fn test_decode_poet_info_rejects_unusable_offsets() {
        for (phase_shift, cycle_gap) in [("inf", "12h"), ("240h", "NaN"), ("-1h", "12h"), ("876000h", "12h")] {
            let json = format!(
                r#"{{"poets": [], "config": {{"phaseShift": "{phase_shift}", "cycleGap": "{cycle_gap}"}}}}"#
            );
            let response: PoetInfoResponse = serde_json::from_str(&json).unwrap();
            assert!(
                matches!(response.into_domain(), Err(RpcError::Types(_))),
                "accepted {} / {}",
                phase_shift,
                cycle_gap
            );
        }
    }

    #[test]
    fn test_decode_poet_info() {
        let json = r#"{"poets": ["https://poet-1.example"], "config": {"phaseShift": "240h", "cycleGap": "12h"}}"#;
        let response: PoetInfoResponse = serde_json::from_str(json).unwrap();
        let poet = response.into_domain().unwrap();
        assert_eq!(poet.poets.len(), 1);
        assert_eq!(poet.config.phase_shift, 240 * 3_600_000);
        assert_eq!(poet.config.cycle_gap, 12 * 3_600_000);
    }

    #[test]
    fn test_decode_states() {
        let smesher = identity(1).to_base64();
        let json = format!(
            r#"{{"states": [
                {{"smesher": "{smesher}", "state": "ELIGIBLE", "time": "2024-01-01T00:00:00Z",
                  "publishEpoch": 3,
                  "eligible": {{"epoch": 3, "layers": [{{"layer": 10, "count": 2}}]}}}},
                {{"smesher": "{smesher}", "state": "PROPOSAL_PUBLISH_FAILED", "time": "2024-01-01T00:05:00.500Z",
                  "proposalPublishFailed": {{"proposal": "AAEC", "layer": "12", "message": "boom"}}}},
                {{"smesher": "{smesher}", "state": "ATX_READY", "time": "2024-01-01T00:06:00Z",
                  "atxReady": {{}}}}
            ]}}"#
        );
        let response: StatesResponse = serde_json::from_str(&json).unwrap();
        let events = response.into_domain().unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].smesher, identity(1));
        assert_eq!(events[0].time, 1_704_067_200_000);
        assert_eq!(events[0].publish_epoch, Some(3));
        assert_eq!(
            events[0].details,
            EventDetails::Eligible {
                epoch: Some(3),
                layers: vec![EligibleLayer { layer: 10, count: 2 }],
            }
        );
        assert_eq!(events[1].time, 1_704_067_500_500);
        assert_eq!(
            events[1].details,
            EventDetails::ProposalPublishFailed {
                proposal: "000102".to_string(),
                layer: 12,
                message: "boom".to_string(),
            }
        );
        assert_eq!(events[2].kind(), EventKind::AtxReady);
    }

    #[test]
    fn test_decode_state_without_details_fails() {
        let json = format!(
            r#"{{"states": [{{"smesher": "{}", "state": "RETRYING", "time": "2024-01-01T00:00:00Z"}}]}}"#,
            identity(1).to_base64()
        );
        let response: StatesResponse = serde_json::from_str(&json).unwrap();
        assert!(matches!(response.into_domain(), Err(RpcError::Decode(_))));
    }

    #[test]
    fn test_decode_unknown_state_fails() {
        let json = r#"{"states": [{"smesher": "AAEC", "state": "SOMETHING_NEW", "time": "2024-01-01T00:00:00Z"}]}"#;
        assert!(serde_json::from_str::<StatesResponse>(json).is_err());
    }

    #[test]
    fn test_decode_rewards_splits_fees() {
        let json = format!(
            r#"{{"rewards": [{{"layer": 42, "layerReward": "1000", "total": "1500", "coinbase": "sm1qqq", "smesher": "{}"}}]}}"#,
            identity(2).to_base64()
        );
        let response: RewardsResponse = serde_json::from_str(&json).unwrap();
        let rewards = response.into_domain().unwrap();
        assert_eq!(rewards[0].layer_paid, 42);
        assert_eq!(rewards[0].reward_for_layer, Smidge::new(1000));
        assert_eq!(rewards[0].reward_for_fees, Smidge::new(500));
        assert_eq!(rewards[0].smesher, identity(2));
    }

    #[test]
    fn test_decode_eligibilities_and_proposals() {
        let id = identity(3);
        let json = format!(
            r#"{{"identities": {{"{}": {{"epochs": {{"3": {{"eligibilities": [{{"layer": 12100, "count": 1}}]}}}}}}}}}}"#,
            id.to_hex()
        );
        let response: EligibilitiesResponse = serde_json::from_str(&json).unwrap();
        let eligibilities = response.into_domain().unwrap();
        assert_eq!(eligibilities[&id][&3], vec![Eligibility { layer: 12100, count: 1 }]);

        let json = format!(
            r#"{{"proposals": {{"{}": {{"proposals": [{{"layer": 12100, "proposal": "abcd"}}]}}}}}}"#,
            id.to_base64()
        );
        let response: ProposalsResponse = serde_json::from_str(&json).unwrap();
        let proposals = response.into_domain().unwrap();
        assert_eq!(proposals[&id][0].layer, 12100);
    }

    #[test]
    fn test_decode_node_status() {
        let json = r#"{"connectedPeers": "12", "status": "SYNC_STATUS_SYNCED", "latestLayer": 20, "appliedLayer": 19, "processedLayer": 19, "currentLayer": 20}"#;
        let response: NodeStatusResponse = serde_json::from_str(json).unwrap();
        let status = response.into_domain();
        assert!(status.is_synced);
        assert_eq!(status.connected_peers, 12);
        assert_eq!(status.current_layer, 20);
    }

    fn event_at(time: Millis) -> SmesherEvent {
        SmesherEvent::new(identity(1), time, EventDetails::AtxReady)
    }

    #[tokio::test]
    async fn test_mock_serves_windows() {
        let api = MockApi::new();
        api.push_events((1..=10).map(|t| event_at(t * 10)));

        let asc = WindowQuery {
            order: SortOrder::Asc,
            to: 100,
            from: Some(30),
            limit: 3,
        };
        let page = api.smesher_states_chunk(&asc).await.unwrap();
        assert_eq!(page.iter().map(|e| e.time).collect::<Vec<_>>(), vec![30, 40, 50]);

        let desc = WindowQuery {
            order: SortOrder::Desc,
            to: 75,
            from: None,
            limit: 2,
        };
        let page = api.smesher_states_chunk(&desc).await.unwrap();
        assert_eq!(page.iter().map(|e| e.time).collect::<Vec<_>>(), vec![70, 60]);

        assert_eq!(api.calls(), vec![MockCall::States(asc), MockCall::States(desc)]);
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let api = MockApi::new();
        api.fail_next("node_status", 2);

        assert!(matches!(api.node_status().await, Err(RpcError::Transport(_))));
        assert!(api.node_status().await.is_err());
        assert!(api.node_status().await.is_ok());
        assert_eq!(api.calls_to("node_status").len(), 3);
        assert!(matches!(api.network_info().await, Err(RpcError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_mock_reward_offsets() {
        let api = MockApi::new();
        let id = identity(4);
        let rewards: Vec<Reward> = (0..5)
            .map(|layer| Reward {
                layer_paid: layer,
                reward_for_layer: Smidge::new(1),
                reward_for_fees: Smidge::ZERO,
                coinbase: "sm1".to_string(),
                smesher: id,
            })
            .collect();
        api.set_rewards(id, rewards);

        let page = api.rewards_chunk(&id, 2, 4).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].layer_paid, 4);
        assert!(api.rewards_chunk(&identity(5), 2, 0).await.unwrap().is_empty());
    }
}
