
use utils::{Serialize, Deserialize};

///
/// Where the shards live and how their files are named. A shard with id 3 is
/// stored as `X_boards_batch_0003.npy`, `y_policy_batch_0003.npy` and
/// `y_value_batch_0003.npy` under the default naming.
///
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config
{
    #[serde(default = "dir")]
    pub dir: String,

    #[serde(default = "board_prefix")]
    pub board_prefix: String,

    #[serde(default = "policy_prefix")]
    pub policy_prefix: String,

    #[serde(default = "value_prefix")]
    pub value_prefix: String,

    #[serde(default = "id_width")]
    pub id_width: usize
}

impl Default for Config
{
    fn default () -> Config
    {
        Config
        {
            dir: dir(),
            board_prefix: board_prefix(),
            policy_prefix: policy_prefix(),
            value_prefix: value_prefix(),
            id_width: id_width()
        }
    }
}

fn dir () -> String
{
    "processed_data_tactics".to_owned()
}

fn board_prefix () -> String
{
    "X_boards_batch_".to_owned()
}

fn policy_prefix () -> String
{
    "y_policy_batch_".to_owned()
}

fn value_prefix () -> String
{
    "y_value_batch_".to_owned()
}

fn id_width () -> usize
{
    4
}
