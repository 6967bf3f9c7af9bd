//! Typed contract calls for the poll contract.

use pollchain_types::{OptionIndex, PollIndex};

use crate::abi::{self, ParamType, Token};
use crate::LedgerError;

const CREATE_POLL: &str = "createPoll(string,string[])";
const VOTE: &str = "vote(uint256,uint256)";
const GET_ALL_POLLS: &str = "getAllPolls()";
const GET_RESULTS: &str = "getResults(uint256)";

/// A state-changing contract call, carried by a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractCall {
    CreatePoll { title: String, options: Vec<String> },
    Vote { poll_index: PollIndex, option_index: OptionIndex },
}

impl ContractCall {
    pub fn method(&self) -> &'static str {
        match self {
            ContractCall::CreatePoll { .. } => "createPoll",
            ContractCall::Vote { .. } => "vote",
        }
    }

    pub fn calldata(&self) -> Vec<u8> {
        match self {
            ContractCall::CreatePoll { title, options } => abi::encode_call(
                CREATE_POLL,
                &[
                    Token::String(title.clone()),
                    Token::Array(options.iter().cloned().map(Token::String).collect()),
                ],
            ),
            ContractCall::Vote {
                poll_index,
                option_index,
            } => abi::encode_call(VOTE, &[Token::Uint(*poll_index), Token::Uint(*option_index)]),
        }
    }
}

/// A read-only contract call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadCall {
    GetAllPolls,
    GetResults { poll_index: PollIndex },
}

/// Decoded return value of a [`ReadCall`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadOutput {
    /// `(titles, options-per-poll)`, exactly as the contract returned them.
    Polls {
        titles: Vec<String>,
        options: Vec<Vec<String>>,
    },
    /// Vote counts in option order.
    Results(Vec<u64>),
}

impl ReadCall {
    pub fn method(&self) -> &'static str {
        match self {
            ReadCall::GetAllPolls => "getAllPolls",
            ReadCall::GetResults { .. } => "getResults",
        }
    }

    pub fn calldata(&self) -> Vec<u8> {
        match self {
            ReadCall::GetAllPolls => abi::encode_call(GET_ALL_POLLS, &[]),
            ReadCall::GetResults { poll_index } => {
                abi::encode_call(GET_RESULTS, &[Token::Uint(*poll_index)])
            }
        }
    }

    /// Decode the raw return data of this call.
    pub fn decode_output(&self, data: &[u8]) -> Result<ReadOutput, LedgerError> {
        match self {
            ReadCall::GetAllPolls => {
                let types = [
                    ParamType::array(ParamType::String),
                    ParamType::array(ParamType::array(ParamType::String)),
                ];
                let mut tokens = abi::decode(&types, data)?.into_iter();
                let titles = next(&mut tokens)?
                    .into_array()?
                    .into_iter()
                    .map(Token::into_string)
                    .collect::<Result<Vec<_>, _>>()?;
                let options = next(&mut tokens)?
                    .into_array()?
                    .into_iter()
                    .map(|poll| {
                        poll.into_array()?
                            .into_iter()
                            .map(Token::into_string)
                            .collect::<Result<Vec<_>, _>>()
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ReadOutput::Polls { titles, options })
            }
            ReadCall::GetResults { .. } => {
                let mut tokens =
                    abi::decode(&[ParamType::array(ParamType::Uint)], data)?.into_iter();
                let counts = next(&mut tokens)?
                    .into_array()?
                    .into_iter()
                    .map(Token::into_uint)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ReadOutput::Results(counts))
            }
        }
    }
}

fn next(tokens: &mut impl Iterator<Item = Token>) -> Result<Token, LedgerError> {
    tokens
        .next()
        .ok_or_else(|| LedgerError::Decode("missing return value".into()))
}
