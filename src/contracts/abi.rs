//! Contract ABI definitions for the Momentum deployment.
//!
//! Only the functions and events the client touches are declared. The
//! `#[sol(rpc)]` attribute generates typed call builders bound to a provider.

use alloy::primitives::{keccak256, B256};
use alloy::sol;
use alloy::sol_types::SolEvent;

sol! {
    #[sol(rpc)]
    contract MockUSDC {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function faucet() external;

        event Transfer(address indexed from, address indexed to, uint256 value);
        event Approval(address indexed owner, address indexed spender, uint256 value);
    }

    #[sol(rpc)]
    contract ContestFactory {
        function createContest(string _question, string _optionA, string _optionB) external returns (address);
        function getAllContests() external view returns (address[]);
        function getContestCount() external view returns (uint256);
        function getContest(uint256 index) external view returns (address);
        function isValidContest(address contest) external view returns (bool);
        function getActiveContests() external view returns (address[]);
        function getResolvedContests() external view returns (address[]);
        function getContestBatch(uint256 startIndex, uint256 count) external view returns (address[]);
        function withdrawPlatformFees() external;
        function getPlatformFeeBalance() external view returns (uint256);
        function getFactoryStats() external view returns (
            uint256 totalContests,
            uint256 activeContests,
            uint256 resolvedContests,
            uint256 totalFeesCollected
        );
        function owner() external view returns (address);
        function stakingToken() external view returns (address);
        function CONTEST_DURATION() external view returns (uint256);

        event ContestCreated(
            address indexed contestAddress,
            string question,
            string optionA,
            string optionB,
            uint256 endTime,
            address indexed creator
        );
        event PlatformFeesWithdrawn(address indexed owner, uint256 amount);
    }

    #[sol(rpc)]
    contract Contest {
        function stake(bool _forA, uint256 _amount) external;
        function resolve() external;
        function claim() external;
        function calculateWinnings(address user) external view returns (uint256);
        function question() external view returns (string);
        function optionA_text() external view returns (string);
        function optionB_text() external view returns (string);
        function endTime() external view returns (uint256);
        function isResolved() external view returns (bool);
        function winnerIsA() external view returns (bool);
        function totalStakedOnA() external view returns (uint256);
        function totalStakedOnB() external view returns (uint256);
        function hasClaimed(address user) external view returns (bool);
        function getTotalPool() external view returns (uint256);
        function getUserStakes(address user) external view returns (uint256 onA, uint256 onB, uint256 total);
        function isWinner(address user) external view returns (bool);
        function getWinningOption() external view returns (bool isA, string optionText, uint256 totalStaked);
        function getPlatformFee() external view returns (uint256);
        function MINIMUM_STAKE() external view returns (uint256);
        function PLATFORM_FEE_PERCENT() external view returns (uint256);

        event Staked(address indexed user, bool forA, uint256 amount, uint256 timestamp);
        event ContestResolved(bool winnerIsA, uint256 totalA, uint256 totalB, uint256 platformFee, uint256 timestamp);
        event WinningsClaimed(address indexed user, uint256 amount, uint256 timestamp);
    }
}

/// Topic0 of every contest-level event the event poller watches.
pub fn contest_event_topics() -> Vec<B256> {
    vec![
        Contest::Staked::SIGNATURE_HASH,
        Contest::ContestResolved::SIGNATURE_HASH,
        Contest::WinningsClaimed::SIGNATURE_HASH,
    ]
}

/// Check the generated event selectors against the canonical signatures.
/// Logged at startup so an ABI drift is obvious before any log is missed.
pub fn verify_topic_hashes() -> Vec<(String, bool)> {
    let checks = vec![
        (
            "Staked(address,bool,uint256,uint256)",
            Contest::Staked::SIGNATURE_HASH,
        ),
        (
            "ContestResolved(bool,uint256,uint256,uint256,uint256)",
            Contest::ContestResolved::SIGNATURE_HASH,
        ),
        (
            "WinningsClaimed(address,uint256,uint256)",
            Contest::WinningsClaimed::SIGNATURE_HASH,
        ),
        (
            "ContestCreated(address,string,string,string,uint256,address)",
            ContestFactory::ContestCreated::SIGNATURE_HASH,
        ),
    ];

    checks
        .into_iter()
        .map(|(sig, expected)| {
            let computed = keccak256(sig.as_bytes());
            (sig.to_string(), computed == expected)
        })
        .collect()
}
