use cnb_shim_common::{read_toml_file, StructuredFileError};
use cnb_shim_data::order::{Group, Order};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const ORDER_FILE_PREFIX: &str = "order";
const ORDER_FILE_EXTENSION: &str = "toml";

#[derive(thiserror::Error, Debug)]
pub enum OrderMergeError {
    #[error("no order files found in {0}")]
    NoOrderFiles(String),

    #[error("Could not list order files in {0}: {1}")]
    ListOrderFiles(String, #[source] io::Error),

    #[error("Could not read order file: {0}")]
    ReadOrderFile(#[from] StructuredFileError),
}

/// File name of the order stored by the supply phase with the given index.
///
/// ```
/// use cnb_shim::order_merge::order_file_name;
///
/// assert_eq!(order_file_name(3), "order3.toml");
/// ```
#[must_use]
pub fn order_file_name(phase_index: usize) -> String {
    format!("{ORDER_FILE_PREFIX}{phase_index}.{ORDER_FILE_EXTENSION}")
}

/// Reads every order file in `order_dir` and combines them into a single order.
///
/// Files are combined in the order of the supply phases that stored them. Files that do not
/// follow the `order<index>.toml` naming come last, sorted by name.
pub fn merge_order_files(order_dir: &Path) -> Result<Order, OrderMergeError> {
    let order_files = sorted_order_files(order_dir)?;
    if order_files.is_empty() {
        return Err(OrderMergeError::NoOrderFiles(
            order_dir.to_string_lossy().into_owned(),
        ));
    }

    let orders = order_files
        .iter()
        .map(read_toml_file::<Order>)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(combine_orders(&orders))
}

fn sorted_order_files(order_dir: &Path) -> Result<Vec<PathBuf>, OrderMergeError> {
    let list_error =
        |error| OrderMergeError::ListOrderFiles(order_dir.to_string_lossy().into_owned(), error);

    let mut order_files = Vec::new();
    for dir_entry in fs::read_dir(order_dir).map_err(list_error)? {
        let dir_entry = dir_entry.map_err(list_error)?;
        if dir_entry.file_type().map_err(list_error)?.is_file() {
            order_files.push(dir_entry.path());
        }
    }

    order_files.sort_by_cached_key(|path| {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        (phase_index(&file_name).unwrap_or(usize::MAX), file_name)
    });

    Ok(order_files)
}

fn phase_index(file_name: &str) -> Option<usize> {
    file_name
        .strip_prefix(ORDER_FILE_PREFIX)?
        .strip_suffix(ORDER_FILE_EXTENSION)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

/// Combines orders into one whose groups are every combination of one group from each order.
///
/// Within a combined group, buildpacks and labels appear in the order of the orders they came
/// from. A buildpack referenced more than once keeps only its first occurrence.
///
/// ```
/// use cnb_shim::order_merge::combine_orders;
/// use cnb_shim_data::order::{BuildpackRef, Group, Order};
///
/// let order = |label: &str, ids: &[&str]| Order {
///     groups: vec![Group {
///         labels: vec![String::from(label)],
///         buildpacks: ids
///             .iter()
///             .map(|id| BuildpackRef::required(id.parse().unwrap()))
///             .collect(),
///     }],
/// };
///
/// let combined = combine_orders(&[order("X", &["a", "b"]), order("Y", &["b", "c"])]);
///
/// assert_eq!(combined.groups.len(), 1);
/// assert_eq!(combined.groups[0].labels, ["X", "Y"]);
/// let ids: Vec<&str> = combined.buildpack_ids().iter().map(|id| id.as_str()).collect();
/// assert_eq!(ids, ["a", "b", "c"]);
/// ```
#[must_use]
pub fn combine_orders(orders: &[Order]) -> Order {
    let mut groups = vec![Group::default()];

    for order in orders.iter().rev() {
        let mut combined_groups = Vec::with_capacity(order.groups.len() * groups.len());

        for current_group in &order.groups {
            for combined_so_far in &groups {
                let mut group = Group {
                    labels: current_group.labels.clone(),
                    buildpacks: current_group.buildpacks.clone(),
                };
                group.labels.extend(combined_so_far.labels.iter().cloned());
                group
                    .buildpacks
                    .extend(combined_so_far.buildpacks.iter().cloned());

                let mut seen_ids = HashSet::new();
                group
                    .buildpacks
                    .retain(|buildpack| seen_ids.insert(buildpack.id.clone()));

                combined_groups.push(group);
            }
        }

        groups = combined_groups;
    }

    Order { groups }
}
